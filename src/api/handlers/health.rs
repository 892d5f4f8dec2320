/*
 * Responsibility
 * - GET /api/health (liveness, no auth, no store access)
 */
use serde_json::json;

use crate::envelope::Reply;
use crate::routing::{ApiResult, Request};
use crate::state::AppState;

pub async fn health(_state: AppState, _req: Request) -> ApiResult {
    Reply::ok("API is running").with_data(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}
