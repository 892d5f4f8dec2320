//! Browser CORS policy for the marketplace front end.
//!
//! Policy:
//! - Development: any origin, no credentials.
//! - Production: only origins listed in `CORS_ALLOWED_ORIGINS`; an empty list
//!   means no CORS headers at all.
//!
//! `OPTIONS` never reaches `CorsLayer`: it goes straight to the route
//! dispatcher, which always answers 200 with wildcard CORS headers. The
//! origin policy above applies to every other method.

use std::time::Duration;

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

pub fn apply(router: Router, config: &Config) -> Router {
    let with_cors = router.clone().layer(layer(config));

    Router::new().fallback_service(tower::service_fn(move |req: Request| {
        let svc = if req.method() == Method::OPTIONS {
            router.clone()
        } else {
            with_cors.clone()
        };
        svc.oneshot(req)
    }))
}

fn layer(config: &Config) -> CorsLayer {
    let origin = if config.app_env.is_production() {
        let allowed: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        AllowOrigin::list(allowed)
    } else {
        AllowOrigin::from(Any)
    };

    // Never pair a wildcard origin with allow_credentials(true).
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(Duration::from_secs(600))
}
