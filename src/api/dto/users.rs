/*
 * Responsibility
 * - Users request/response DTOs
 * - validate() for shape checks before touching the store
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::dto::{check_password, double_option, require};
use crate::error::AppError;
use crate::repos::{ProfileUpdate, UserRecord, UserStatus};
use crate::services::auth::Role;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.fullname
            && name.trim().is_empty()
        {
            return Err(AppError::bad_request("fullname cannot be empty"));
        }
        if let Some(Some(phone)) = &self.phone
            && phone.len() > 32
        {
            return Err(AppError::bad_request("phone must be <= 32 chars"));
        }
        Ok(())
    }

    pub fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            fullname: self.fullname.map(|s| s.trim().to_string()),
            phone: self.phone,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[
            ("current_password", self.current_password.as_str()),
            ("new_password", self.new_password.as_str()),
        ])?;
        check_password("new_password", self.new_password.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: String,
}

impl UpdateStatusRequest {
    pub fn status(&self) -> Result<UserStatus, AppError> {
        require(&[("status", self.status.as_str())])?;
        self.status
            .parse()
            .map_err(|_| AppError::bad_request("Invalid status"))
    }
}

/// A user as returned to clients (never includes the password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            fullname: u.fullname,
            email: u.email,
            role: u.role,
            status: u.status,
            phone: u.phone,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
}
