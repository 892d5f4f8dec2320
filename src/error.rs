/*
 * Responsibility
 * - Application-wide AppError
 * - Error envelope {status: "error", message, errors?} + HTTP status mapping
 * - Layer errors (repo / auth / routing / token / config) convert via From
 * - 500 detail (error, file, line) is only rendered in debug mode
 */
use std::collections::BTreeMap;
use std::panic::Location;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::middleware::auth::AuthError;
use crate::repos::error::RepoError;
use crate::routing::RouteError;
use crate::services::auth::{DecodeError, token_issuer::KindError};

pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest {
        message: String,
        errors: Option<Value>,
    },
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("request timed out")]
    Timeout,
    #[error("request body too large")]
    PayloadTooLarge,
    // A guarded-only handler reached without a guard, or similar wiring mistake.
    #[error("handler misconfigured: {0}")]
    HandlerMisconfigured(&'static str),
    #[error("internal error: {error}")]
    Internal {
        error: anyhow::Error,
        location: &'static Location<'static>,
    },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            errors: None,
        }
    }

    /// 400 with a per-field `errors` object.
    pub fn validation(message: impl Into<String>, errors: BTreeMap<&'static str, String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            errors: serde_json::to_value(errors).ok(),
        }
    }

    pub fn invalid_token() -> Self {
        Self::Unauthorized(INVALID_TOKEN.to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(INSUFFICIENT_PERMISSIONS.to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    #[track_caller]
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            error: error.into(),
            location: Location::caller(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::HandlerMisconfigured(_) | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render the error envelope. `debug` adds internal detail to 500s.
    pub fn to_response(self, debug: bool) -> Response {
        let status = self.status();

        let (message, errors, detail) = match self {
            AppError::BadRequest { message, errors } => (message, errors, None),
            AppError::Unauthorized(message)
            | AppError::Forbidden(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message) => (message, None, None),
            AppError::Timeout => ("Request timed out".to_string(), None, None),
            AppError::PayloadTooLarge => ("Request body too large".to_string(), None, None),
            AppError::HandlerMisconfigured(what) => {
                error!(reason = what, "handler misconfigured");
                (
                    "Internal server error".to_string(),
                    None,
                    Some(DebugInfo {
                        error: format!("handler misconfigured: {what}"),
                        file: None,
                        line: None,
                    }),
                )
            }
            AppError::Internal { error, location } => {
                error!(
                    error = ?error,
                    file = location.file(),
                    line = location.line(),
                    "internal error"
                );
                (
                    "Internal server error".to_string(),
                    None,
                    Some(DebugInfo {
                        error: format!("{error:#}"),
                        file: Some(location.file()),
                        line: Some(location.line()),
                    }),
                )
            }
        };

        let body = ErrorBody {
            status: "error",
            message,
            errors,
            debug: detail.filter(|_| debug),
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}

impl From<RepoError> for AppError {
    #[track_caller]
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => AppError::Conflict("Email already registered".into()),
            other => AppError::internal(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredential => AppError::Unauthorized("No token provided".into()),
            AuthError::InvalidCredential(_) => AppError::invalid_token(),
            AuthError::InsufficientRole { .. } | AuthError::NotOwner => AppError::forbidden(),
        }
    }
}

impl From<DecodeError> for AppError {
    fn from(_: DecodeError) -> Self {
        AppError::invalid_token()
    }
}

impl From<KindError> for AppError {
    fn from(_: KindError) -> Self {
        AppError::invalid_token()
    }
}

impl From<RouteError> for AppError {
    #[track_caller]
    fn from(e: RouteError) -> Self {
        AppError::internal(e)
    }
}

impl From<ConfigError> for AppError {
    #[track_caller]
    fn from(e: ConfigError) -> Self {
        AppError::internal(e)
    }
}
