/*
 * Responsibility
 * - handlers under /users (profile, password change, admin listing / deletion)
 * - Access is decided by the route's Policy before these run; handlers only
 *   read the attached identity
 */
use tracing::info;

use crate::api::dto::users::{
    ChangePasswordRequest, UpdateProfileRequest, UserListResponse, UserResponse,
};
use crate::api::handlers::parse_user_id;
use crate::envelope::Reply;
use crate::error::AppError;
use crate::routing::{ApiResult, Request};
use crate::services::auth::{hash_password, verify_password};
use crate::state::AppState;

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

fn path_id(req: &Request) -> Result<&str, AppError> {
    req.param("id")
        .ok_or(AppError::HandlerMisconfigured("route has no {id} parameter"))
}

pub async fn me(state: AppState, req: Request) -> ApiResult {
    let id = parse_user_id(&req.identity()?.user_id)?;
    let user = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;

    Reply::ok("User retrieved").with_data(UserResponse::from(user))
}

pub async fn update_me(state: AppState, req: Request) -> ApiResult {
    let id = parse_user_id(&req.identity()?.user_id)?;
    update_profile(state, &req, id).await
}

pub async fn change_password(state: AppState, req: Request) -> ApiResult {
    let id = parse_user_id(&req.identity()?.user_id)?;
    let body: ChangePasswordRequest = req.json()?;
    body.validate()?;

    let user = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
    let matches = verify_password(&user.password_hash, &body.current_password)
        .map_err(|e| AppError::internal(e))?;
    if !matches {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let password_hash = hash_password(&body.new_password).map_err(|e| AppError::internal(e))?;
    state.users.update_password(id, &password_hash).await?;

    info!(user_id = %id, "password changed");
    Ok(Reply::ok("Password updated successfully"))
}

pub async fn list(state: AppState, _req: Request) -> ApiResult {
    let users: Vec<UserResponse> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Reply::ok("Users retrieved").with_data(UserListResponse {
        total: users.len(),
        users,
    })
}

pub async fn get(state: AppState, req: Request) -> ApiResult {
    let id = parse_user_id(path_id(&req)?)?;
    let user = state.users.find_by_id(id).await?.ok_or_else(user_not_found)?;

    Reply::ok("User retrieved").with_data(UserResponse::from(user))
}

pub async fn update(state: AppState, req: Request) -> ApiResult {
    let id = parse_user_id(path_id(&req)?)?;
    update_profile(state, &req, id).await
}

pub async fn delete(state: AppState, req: Request) -> ApiResult {
    let raw = path_id(&req)?;
    let identity = req.identity()?;
    if raw == "me" || raw == identity.user_id {
        return Err(AppError::bad_request("Cannot delete yourself"));
    }

    let id = parse_user_id(raw)?;
    if !state.users.delete(id).await? {
        return Err(user_not_found());
    }

    info!(user_id = %id, by = %identity.user_id, "user deleted");
    Ok(Reply::ok("User deleted successfully"))
}

async fn update_profile(state: AppState, req: &Request, id: uuid::Uuid) -> ApiResult {
    let body: UpdateProfileRequest = req.json()?;
    body.validate()?;

    let user = state
        .users
        .update_profile(id, body.into_update())
        .await?
        .ok_or_else(user_not_found)?;

    Reply::ok("Profile updated successfully").with_data(UserResponse::from(user))
}
