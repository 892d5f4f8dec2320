/*
 * Responsibility
 * - URL structure of the API (everything below /api)
 * - Which Policy guards which route
 * - Registration order is match order: literal routes before {id} routes
 */
use std::sync::{Arc, OnceLock};

use crate::api::handlers::{admin, auth, debug, health, users};
use crate::middleware::auth::{AccessGuard, Policy};
use crate::routing::{RouteError, Router};
use crate::services::auth::Role;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api";

const ADMIN: &[Role] = &[Role::Admin];

pub fn routes(guard: &AccessGuard, debug: bool) -> Result<Router<AppState>, RouteError> {
    let mut router = Router::new().with_prefix(API_PREFIX).with_debug(debug);

    router
        .get("/health", health::health)?
        // Auth (public)
        .post("/auth/register", auth::register)?
        .post("/auth/login", auth::login)?
        .post("/auth/refresh", auth::refresh)?
        .post("/auth/forgot-password", auth::forgot_password)?
        .post("/auth/reset-password", auth::reset_password)?
        .post("/auth/logout", auth::logout)?
        // Current user
        .get("/users/me", guard.protect(Policy::Authenticated, users::me))?
        .put("/users/me", guard.protect(Policy::Authenticated, users::update_me))?
        .put(
            "/users/me/password",
            guard.protect(Policy::Authenticated, users::change_password),
        )?
        // Users by id
        .get("/users", guard.protect(Policy::Roles(ADMIN), users::list))?
        .get("/users/{id}", guard.protect(Policy::OwnerOf("id"), users::get))?
        .put("/users/{id}", guard.protect(Policy::OwnerOf("id"), users::update))?
        .delete("/users/{id}", guard.protect(Policy::Roles(ADMIN), users::delete))?
        // Moderation
        .put(
            "/admin/users/{id}/status",
            guard.protect(Policy::Roles(ADMIN), admin::update_user_status),
        )?;

    if debug {
        let table: debug::RouteTable = Arc::new(OnceLock::new());
        router.get("/debug/routes", debug::routes(table.clone()))?;
        let _ = table.set(router.describe());
    }

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::{Algorithm, TokenCodec, TokenIssuer, TokenTtls};

    fn guard() -> AccessGuard {
        AccessGuard::new(Arc::new(TokenIssuer::new(
            Arc::new(TokenCodec::new("routes-secret", Algorithm::HS256)),
            TokenTtls::default(),
        )))
    }

    #[test]
    fn literal_me_routes_come_before_id_routes() {
        let listing = routes(&guard(), false).unwrap().describe();
        let position = |method: &str, path: &str| {
            listing
                .iter()
                .position(|r| r.method == method && r.path == path)
                .unwrap()
        };

        assert!(position("GET", "/users/me") < position("GET", "/users/{id}"));
        assert!(position("PUT", "/users/me") < position("PUT", "/users/{id}"));
    }

    #[test]
    fn debug_routes_only_in_debug_mode() {
        let has_debug = |debug| {
            routes(&guard(), debug)
                .unwrap()
                .describe()
                .iter()
                .any(|r| r.path == "/debug/routes")
        };
        assert!(!has_debug(false));
        assert!(has_debug(true));
    }
}
