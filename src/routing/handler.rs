use std::{future::Future, pin::Pin};

use crate::envelope::Reply;
use crate::error::AppError;
use crate::routing::request::Request;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What every route handler resolves to.
pub type ApiResult = Result<Reply, AppError>;

/// A route target: shared state plus the request in, one result out.
///
/// Implemented for any `Fn(S, Request) -> impl Future<Output = ApiResult>`,
/// so plain `async fn`s register directly.
pub trait Handler<S>: Send + Sync + 'static {
    fn call(&self, state: S, req: Request) -> BoxFuture<ApiResult>;
}

impl<S, F, Fut> Handler<S> for F
where
    F: Fn(S, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult> + Send + 'static,
{
    fn call(&self, state: S, req: Request) -> BoxFuture<ApiResult> {
        Box::pin(self(state, req))
    }
}
