use crate::services::auth::{Claims, Role};

/// Who is calling, as established by a verified access token. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Tokens without a role claim are treated as plain clients.
    pub fn from_claims(claims: &Claims) -> Self {
        Self::new(claims.sub.clone(), claims.role.unwrap_or(Role::Client))
    }
}
