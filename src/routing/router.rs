//! Ordered route table and the single place a response is produced.
//!
//! Responsibility:
//! - Registration: normalize + compile the template, keep insertion order
//! - Dispatch: prefix strip, lower-case, normalize, first method+path match wins
//! - Answer `OPTIONS` preflight directly
//! - Turn a handler's `ApiResult` (or a miss) into exactly one `Response`

use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::envelope::Reply;
use crate::error::AppError;
use crate::routing::{
    RouteError,
    handler::Handler,
    request::Request,
    template::{RouteTemplate, normalize},
};

type NotFoundFn = Box<dyn Fn(&str) -> Response + Send + Sync>;

struct Route<S> {
    method: Method,
    template: RouteTemplate,
    handler: Box<dyn Handler<S>>,
}

/// One row of the route listing served by the debug endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub pattern: String,
}

pub struct Router<S> {
    routes: Vec<Route<S>>,
    prefix: Option<String>,
    not_found: NotFoundFn,
    debug: bool,
}

impl<S> Default for Router<S>
where
    S: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Router<S>
where
    S: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            prefix: None,
            not_found: Box::new(endpoint_not_found),
            debug: false,
        }
    }

    /// Strip `prefix` from incoming paths before matching (segment boundary only).
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = normalize(&prefix.to_lowercase());
        self.prefix = (prefix != "/").then_some(prefix);
        self
    }

    /// Include internal error detail in 500 bodies.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn register<H>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler<S>,
    {
        let template = RouteTemplate::compile(template)?;
        self.routes.push(Route {
            method,
            template,
            handler: Box::new(handler),
        });
        Ok(self)
    }

    pub fn get<H: Handler<S>>(&mut self, template: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.register(Method::GET, template, handler)
    }

    pub fn post<H: Handler<S>>(&mut self, template: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.register(Method::POST, template, handler)
    }

    pub fn put<H: Handler<S>>(&mut self, template: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.register(Method::PUT, template, handler)
    }

    pub fn patch<H: Handler<S>>(&mut self, template: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.register(Method::PATCH, template, handler)
    }

    pub fn delete<H: Handler<S>>(&mut self, template: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.register(Method::DELETE, template, handler)
    }

    /// Replace the default 404 body. The closure receives the path as sent.
    pub fn not_found<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Response + Send + Sync + 'static,
    {
        self.not_found = Box::new(f);
        self
    }

    pub fn describe(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|r| RouteInfo {
                method: r.method.to_string(),
                path: r.template.source().to_string(),
                pattern: r.template.pattern().to_string(),
            })
            .collect()
    }

    /// The path a raw request path is matched as.
    pub fn route_path(&self, raw: &str) -> String {
        let path = normalize(&raw.to_lowercase());
        let Some(prefix) = &self.prefix else {
            return path;
        };
        match path.strip_prefix(prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => normalize(rest),
            _ => path,
        }
    }

    /// Entry point from the HTTP server: buffer the body, then dispatch.
    pub async fn handle(&self, state: S, req: axum::extract::Request) -> Response {
        let (parts, body) = req.into_parts();
        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) if exceeds_length_limit(&e) => {
                warn!(error = %e, "request body over the size limit");
                return AppError::PayloadTooLarge.to_response(self.debug);
            }
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                return AppError::bad_request("Invalid request body").to_response(self.debug);
            }
        };

        let req = Request::new(parts.method, parts.uri.path())
            .with_headers(parts.headers)
            .with_body(body);

        self.dispatch(state, req).await
    }

    pub async fn dispatch(&self, state: S, mut req: Request) -> Response {
        if req.method() == Method::OPTIONS {
            return preflight();
        }

        let path = self.route_path(req.original_path());

        let matched = self.routes.iter().find_map(|route| {
            if route.method != req.method() {
                return None;
            }
            route.template.match_path(&path).map(|params| (route, params))
        });

        let Some((route, params)) = matched else {
            debug!(method = %req.method(), path = %req.original_path(), "no route matched");
            return (self.not_found)(req.original_path());
        };

        req.set_route(path, params);

        match route.handler.call(state, req).await {
            Ok(reply) => reply.into_response(),
            Err(e) => e.to_response(self.debug),
        }
    }
}

// A streamed body cut off by `RequestBodyLimitLayer` surfaces as a read error
// wrapping `LengthLimitError`.
fn exceeds_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn endpoint_not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": "Endpoint not found",
            "path": path,
        })),
    )
        .into_response()
}

fn preflight() -> Response {
    let mut res = Reply::ok("OK").into_response();
    let headers = res.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Requested-With"),
    );
    res
}
