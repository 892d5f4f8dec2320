pub mod admin;
pub mod auth;
pub mod debug;
pub mod health;
pub mod users;

use uuid::Uuid;

use crate::error::AppError;

/// Path or token subject -> user id. Anything that is not a UUID cannot name a user.
pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("User not found"))
}
