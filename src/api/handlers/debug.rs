//! Route listing, only registered when APP_DEBUG is on.

use std::sync::{Arc, OnceLock};

use crate::envelope::Reply;
use crate::routing::{ApiResult, Handler, Request, RouteInfo};
use crate::state::AppState;

/// The table is filled in after every route (this one included) is registered.
pub type RouteTable = Arc<OnceLock<Vec<RouteInfo>>>;

pub fn routes(table: RouteTable) -> impl Handler<AppState> {
    move |_state: AppState, _req: Request| {
        let table = table.clone();
        async move {
            let routes = table.get().cloned().unwrap_or_default();
            let reply: ApiResult = Reply::ok("Registered routes").with_data(routes);
            reply
        }
    }
}
