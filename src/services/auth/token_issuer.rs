use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use crate::error::AppError;
use crate::services::auth::{
    claims::{Claims, TokenKind},
    roles::Role,
    token_codec::{DecodeError, TokenCodec},
};

/// Token lifetimes (seconds).
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access: i64,
    pub refresh: i64,
    pub reset: i64,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: 900,            // 15 min
            refresh: 7 * 24 * 3600, // 7 days
            reset: 3600,            // 1 hour
        }
    }
}

/// Service-level return type to keep handlers thin.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    ttls: TokenTtls,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, ttls: TokenTtls) -> Self {
        Self { codec, ttls }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn ttls(&self) -> TokenTtls {
        self.ttls
    }

    /// Issue an access token + refresh token for an authenticated subject.
    pub fn issue_pair(&self, sub: &str, role: Role) -> Result<IssuedTokenPair, AppError> {
        self.issue_pair_at(sub, role, chrono::Utc::now().timestamp())
    }

    pub fn issue_pair_at(
        &self,
        sub: &str,
        role: Role,
        now: i64,
    ) -> Result<IssuedTokenPair, AppError> {
        let access = Claims::new(sub, TokenKind::Access)
            .with_role(role)
            .issued_at(now)
            .expires_at(now.saturating_add(self.ttls.access));

        // Refresh tokens carry no role: it is re-read from the store on refresh.
        let refresh = Claims::new(sub, TokenKind::Refresh)
            .issued_at(now)
            .expires_at(now.saturating_add(self.ttls.refresh));

        debug!(sub = %sub, role = %role, "issuing token pair");

        Ok(IssuedTokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            token_type: "Bearer",
            expires_in: self.ttls.access,
        })
    }

    pub fn issue_reset(&self, sub: &str) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::new(sub, TokenKind::Reset)
            .issued_at(now)
            .expires_at(now.saturating_add(self.ttls.reset));
        self.sign(&claims)
    }

    /// Decode `token` and require it to be of `kind`.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, KindError> {
        let claims = self.codec.decode(token)?;
        if claims.kind != kind {
            return Err(KindError::WrongKind {
                expected: kind,
                actual: claims.kind,
            });
        }
        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        self.codec.encode(claims).map_err(|e| {
            error!(error = %e, "failed to sign token");
            AppError::internal(e)
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KindError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("expected {} token, got {}", expected.as_str(), actual.as_str())]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
}
