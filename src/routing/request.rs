use axum::body::Bytes;
use axum::http::{HeaderMap, Method, header::HeaderName};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::middleware::auth::Identity;
use crate::routing::params::Params;

/// One inbound request as seen by handlers.
///
/// The body is already buffered. `path` is the routed (prefix-stripped,
/// lower-cased, normalized) form; `original_path` is what the client sent.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    original_path: String,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: Params,
    identity: Option<Identity>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let original_path = path.into();
        Self {
            method,
            path: original_path.clone(),
            original_path,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::default(),
            identity: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header lookup; `HeaderMap` keys are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn param_at(&self, index: usize) -> Option<&str> {
        self.params.positional(index)
    }

    /// Deserialize the JSON body. An empty body is treated as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(error = %e, "rejecting request body");
            AppError::bad_request("Invalid JSON body")
        })
    }

    /// Identity attached by the access guard.
    ///
    /// Reaching this without one means the route was registered without a
    /// guard, which is a wiring mistake rather than a client error.
    pub fn identity(&self) -> Result<&Identity, AppError> {
        self.identity
            .as_ref()
            .ok_or(AppError::HandlerMisconfigured("route requires an authenticated identity"))
    }

    pub(crate) fn set_route(&mut self, path: String, params: Params) {
        self.path = path;
        self.params = params;
    }

    pub(crate) fn attach_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}
