/*
 * Responsibility
 * - Success envelope: {status: "success", message, data?}
 * - Error envelope lives in error.rs (AppError::to_response)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Serialize)]
struct SuccessBody<'a> {
    status: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

/// A successful handler result.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    message: String,
    data: Option<Value>,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message)
        }
    }

    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self, AppError> {
        self.data = Some(serde_json::to_value(data).map_err(|e| AppError::internal(e))?);
        Ok(self)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            status: "success",
            message: &self.message,
            data: self.data.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}
