/*
 * Responsibility
 * - handlers under /auth: register, login, refresh, forgot/reset password, logout
 * - Token issuing goes through TokenIssuer; passwords through argon2 helpers
 * - Failure messages never reveal whether an email exists
 */
use tracing::{info, warn};

use crate::api::dto::auth::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, ResetTokenResponse, TokensResponse,
};
use crate::api::handlers::parse_user_id;
use crate::envelope::Reply;
use crate::error::AppError;
use crate::repos::NewUser;
use crate::routing::{ApiResult, Request};
use crate::services::auth::{TokenKind, hash_password, verify_password};
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid email or password";
const BAD_REFRESH: &str = "Invalid or expired refresh token";
const BAD_RESET: &str = "Invalid or expired reset token";

pub async fn register(state: AppState, req: Request) -> ApiResult {
    let body: RegisterRequest = req.json()?;
    body.validate()?;
    let role = body.role()?;

    let email = body.email.trim().to_lowercase();
    if state.users.email_exists(&email).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&body.password).map_err(|e| AppError::internal(e))?;

    let user = state
        .users
        .create(NewUser {
            fullname: body.fullname.trim().to_string(),
            email,
            password_hash,
            role,
            phone: body.phone.filter(|p| !p.trim().is_empty()),
        })
        .await?;

    let tokens = state.tokens.issue_pair(&user.id.to_string(), user.role)?;
    info!(user_id = %user.id, role = %user.role, "user registered");

    Reply::created("User registered successfully").with_data(AuthResponse {
        user: user.into(),
        tokens,
    })
}

pub async fn login(state: AppState, req: Request) -> ApiResult {
    let body: LoginRequest = req.json()?;
    body.validate()?;

    let Some(user) = state.users.find_by_email(body.email.trim()).await? else {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    let matches =
        verify_password(&user.password_hash, &body.password).map_err(|e| AppError::internal(e))?;
    if !matches {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    if !user.is_active() {
        return Err(AppError::Forbidden("Account is not active".into()));
    }

    let tokens = state.tokens.issue_pair(&user.id.to_string(), user.role)?;
    state.users.touch_last_login(user.id).await?;

    Reply::ok("Login successful").with_data(AuthResponse {
        user: user.into(),
        tokens,
    })
}

pub async fn refresh(state: AppState, req: Request) -> ApiResult {
    let body: RefreshRequest = req.json()?;
    if body.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("Refresh token is required"));
    }

    let claims = state
        .tokens
        .verify_kind(body.refresh_token.trim(), TokenKind::Refresh)
        .map_err(|e| {
            warn!(reason = %e, "refresh token rejected");
            AppError::Unauthorized(BAD_REFRESH.into())
        })?;

    let id = parse_user_id(&claims.sub).map_err(|_| AppError::Unauthorized(BAD_REFRESH.into()))?;

    // Role is re-read so a changed role takes effect on the next refresh.
    let user = match state.users.find_by_id(id).await? {
        Some(user) if user.is_active() => user,
        _ => {
            warn!(user_id = %id, "refresh for missing or inactive user");
            return Err(AppError::Unauthorized(BAD_REFRESH.into()));
        }
    };

    let tokens = state.tokens.issue_pair(&claims.sub, user.role)?;
    Reply::ok("Token refreshed successfully").with_data(TokensResponse { tokens })
}

pub async fn forgot_password(state: AppState, req: Request) -> ApiResult {
    let body: ForgotPasswordRequest = req.json()?;
    if body.email.trim().is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }

    let reply =
        Reply::ok("If your email exists in our system, you will receive a password reset link");

    let Some(user) = state.users.find_by_email(body.email.trim()).await? else {
        return Ok(reply);
    };

    let reset_token = state.tokens.issue_reset(&user.id.to_string())?;
    info!(user_id = %user.id, "password reset requested");

    // No mail delivery here; debug builds hand the token back so the flow is testable.
    if state.debug {
        return reply.with_data(ResetTokenResponse { reset_token });
    }
    Ok(reply)
}

pub async fn reset_password(state: AppState, req: Request) -> ApiResult {
    let body: ResetPasswordRequest = req.json()?;
    body.validate()?;

    let claims = state
        .tokens
        .verify_kind(body.token.trim(), TokenKind::Reset)
        .map_err(|e| {
            warn!(reason = %e, "reset token rejected");
            AppError::bad_request(BAD_RESET)
        })?;
    let id = parse_user_id(&claims.sub).map_err(|_| AppError::bad_request(BAD_RESET))?;

    let password_hash = hash_password(&body.new_password).map_err(|e| AppError::internal(e))?;
    if !state.users.update_password(id, &password_hash).await? {
        return Err(AppError::bad_request(BAD_RESET));
    }

    info!(user_id = %id, "password reset");
    Ok(Reply::ok("Password reset successful"))
}

/// Tokens are stateless; the client discards them.
pub async fn logout(_state: AppState, _req: Request) -> ApiResult {
    Ok(Reply::ok("Logout successful"))
}
