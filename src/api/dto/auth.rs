use serde::{Deserialize, Serialize};

use crate::api::dto::{check_password, is_valid_email, require, users::UserResponse};
use crate::error::AppError;
use crate::services::auth::{IssuedTokenPair, Role};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[
            ("fullname", self.fullname.as_str()),
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
        ])?;
        if !is_valid_email(&self.email) {
            return Err(AppError::bad_request("Invalid email format"));
        }
        check_password("password", self.password.as_str())
    }

    /// Self-registration may pick client or agent; admins are made, not registered.
    pub fn role(&self) -> Result<Role, AppError> {
        match self.role.as_deref().map(str::parse::<Role>) {
            None => Ok(Role::Client),
            Some(Ok(role @ (Role::Client | Role::Agent))) => Ok(role),
            Some(_) => Err(AppError::bad_request("Invalid role")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[("email", self.email.as_str()), ("password", self.password.as_str())])
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[("token", self.token.as_str()), ("new_password", self.new_password.as_str())])?;
        check_password("new_password", self.new_password.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: IssuedTokenPair,
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: IssuedTokenPair,
}

/// Only populated in debug mode; production delivers the token out of band.
#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub reset_token: String,
}
