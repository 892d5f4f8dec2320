pub mod handler;
pub mod params;
pub mod request;
pub mod router;
pub mod template;

use thiserror::Error;

pub use handler::{ApiResult, BoxFuture, Handler};
pub use params::Params;
pub use request::Request;
pub use router::{RouteInfo, Router};

/// Route table misconfiguration; surfaces at startup.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route `{template}` does not compile: {reason}")]
    InvalidPattern { template: String, reason: String },
}
