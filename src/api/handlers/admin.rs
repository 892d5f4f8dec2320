/*
 * Responsibility
 * - moderation handlers under /admin (admin role enforced by the route policy)
 */
use tracing::info;

use crate::api::dto::users::{UpdateStatusRequest, UserResponse};
use crate::api::handlers::parse_user_id;
use crate::envelope::Reply;
use crate::error::AppError;
use crate::routing::{ApiResult, Request};
use crate::state::AppState;

pub async fn update_user_status(state: AppState, req: Request) -> ApiResult {
    let raw = req
        .param("id")
        .ok_or(AppError::HandlerMisconfigured("route has no {id} parameter"))?;
    let id = parse_user_id(raw)?;
    let status = req.json::<UpdateStatusRequest>()?.status()?;

    let user = state
        .users
        .update_status(id, status)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id = %id, status = %status, by = %req.identity()?.user_id, "user status changed");
    Reply::ok("User status updated").with_data(UserResponse::from(user))
}
