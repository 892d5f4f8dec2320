/*
 * Responsibility
 * - Shared context handed to every handler (AppState)
 * - Cheap to clone: everything behind Arc
 */
use std::sync::Arc;

use crate::repos::UserStore;
use crate::services::auth::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenIssuer>,
    // Echo reset tokens, expose debug routes and 500 detail.
    pub debug: bool,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>, debug: bool) -> Self {
        Self {
            users,
            tokens,
            debug,
        }
    }
}
