//! Bearer credential -> identity, then role / ownership checks.
//!
//! Responsibility:
//! - `authenticate`: `Authorization: Bearer <token>` -> decode -> access kind -> `Identity`
//! - `require_role` / `require_ownership`: authenticate, then authorize
//! - `Guarded`: run a `Policy` before a handler; a rejection returns before the handler is called
//!
//! Failure reasons are logged at `warn` and never echoed to the client.

use std::sync::Arc;

use axum::http::header;
use thiserror::Error;
use tracing::warn;

use crate::middleware::auth::identity::Identity;
use crate::routing::{ApiResult, BoxFuture, Handler, Request};
use crate::services::auth::{Role, TokenIssuer, TokenKind, token_issuer::KindError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed bearer credential")]
    MissingCredential,
    #[error("credential rejected: {0}")]
    InvalidCredential(#[from] KindError),
    #[error("role {role} not in allowed set")]
    InsufficientRole { role: Role },
    #[error("identity does not own the resource")]
    NotOwner,
}

/// Which check a guarded route runs before its handler.
#[derive(Debug, Clone, Copy)]
pub enum Policy {
    /// Any valid access token.
    Authenticated,
    /// Role must be one of these.
    Roles(&'static [Role]),
    /// Named path parameter must equal the caller's id, unless the caller is admin.
    OwnerOf(&'static str),
}

#[derive(Debug, Clone)]
pub struct AccessGuard {
    tokens: Arc<TokenIssuer>,
}

impl AccessGuard {
    pub fn new(tokens: Arc<TokenIssuer>) -> Self {
        Self { tokens }
    }

    pub fn authenticate(&self, req: &mut Request) -> Result<Identity, AuthError> {
        let token = bearer_token(req).ok_or_else(|| {
            warn!(path = %req.original_path(), "no bearer credential");
            AuthError::MissingCredential
        })?;

        let claims = self
            .tokens
            .verify_kind(token, TokenKind::Access)
            .map_err(|e| {
                warn!(path = %req.original_path(), reason = %e, "bearer credential rejected");
                AuthError::from(e)
            })?;

        let identity = Identity::from_claims(&claims);
        req.attach_identity(identity.clone());
        Ok(identity)
    }

    pub fn require_role(&self, req: &mut Request, allowed: &[Role]) -> Result<Identity, AuthError> {
        let identity = self.authenticate(req)?;
        if !allowed.contains(&identity.role) {
            warn!(user_id = %identity.user_id, role = %identity.role, "role not permitted");
            return Err(AuthError::InsufficientRole {
                role: identity.role,
            });
        }
        Ok(identity)
    }

    pub fn require_ownership(
        &self,
        req: &mut Request,
        owner_id: &str,
    ) -> Result<Identity, AuthError> {
        let identity = self.authenticate(req)?;
        if !check_ownership(&identity, owner_id) {
            warn!(user_id = %identity.user_id, owner_id, "not the resource owner");
            return Err(AuthError::NotOwner);
        }
        Ok(identity)
    }

    pub fn check(&self, req: &mut Request, policy: Policy) -> Result<Identity, AuthError> {
        match policy {
            Policy::Authenticated => self.authenticate(req),
            Policy::Roles(allowed) => self.require_role(req, allowed),
            Policy::OwnerOf(param) => {
                // The route template guarantees the capture exists.
                let owner = req.param(param).unwrap_or_default().to_string();
                self.require_ownership(req, &owner)
            }
        }
    }

    /// Wrap `handler` so `policy` is enforced before it runs.
    pub fn protect<H>(&self, policy: Policy, handler: H) -> Guarded<H> {
        Guarded {
            guard: self.clone(),
            policy,
            handler,
        }
    }
}

/// Admins own everything; anyone else only their own id.
pub fn check_ownership(identity: &Identity, owner_id: &str) -> bool {
    identity.role.is_admin() || identity.user_id == owner_id
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.header(header::AUTHORIZATION.as_str())?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub struct Guarded<H> {
    guard: AccessGuard,
    policy: Policy,
    handler: H,
}

impl<S, H> Handler<S> for Guarded<H>
where
    S: Send + 'static,
    H: Handler<S>,
{
    fn call(&self, state: S, mut req: Request) -> BoxFuture<ApiResult> {
        if let Err(e) = self.guard.check(&mut req, self.policy) {
            return Box::pin(async move { ApiResult::Err(e.into()) });
        }
        self.handler.call(state, req)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::http::{Method, StatusCode, header::AUTHORIZATION};

    use super::*;
    use crate::envelope::Reply;
    use crate::error::AppError;
    use crate::routing::Router;
    use crate::services::auth::{Algorithm, TokenCodec, TokenTtls};

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new(
            Arc::new(TokenCodec::new("guard-secret", Algorithm::HS256)),
            TokenTtls::default(),
        ))
    }

    fn bearer(issuer: &TokenIssuer, sub: &str, role: Role) -> String {
        format!("Bearer {}", issuer.issue_pair(sub, role).unwrap().access_token)
    }

    fn request(auth: Option<&str>) -> Request {
        let req = Request::new(Method::GET, "/resource");
        match auth {
            Some(v) => req.with_header(AUTHORIZATION, v),
            None => req,
        }
    }

    #[test]
    fn authenticate_attaches_identity() {
        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());
        let mut req = request(Some(bearer(&tokens, "u1", Role::Agent).as_str()));

        let identity = guard.authenticate(&mut req).unwrap();
        assert_eq!(identity, Identity::new("u1", Role::Agent));
        assert_eq!(req.identity().unwrap(), &identity);
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());
        let token = tokens.issue_pair("u1", Role::Client).unwrap().access_token;

        let mut req = request(Some(format!("bearer {token}").as_str()));
        assert!(guard.authenticate(&mut req).is_ok());
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        let guard = AccessGuard::new(issuer());
        for auth in [None, Some("Token abc"), Some("Bearer"), Some("Bearer   ")] {
            assert!(matches!(
                guard.authenticate(&mut request(auth)),
                Err(AuthError::MissingCredential)
            ));
        }
        assert!(matches!(
            guard.authenticate(&mut request(Some("Bearer not.a.token"))),
            Err(AuthError::InvalidCredential(_))
        ));
    }

    #[test]
    fn refresh_token_is_not_a_bearer_credential() {
        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());
        let refresh = tokens.issue_pair("u1", Role::Admin).unwrap().refresh_token;

        let err = guard
            .authenticate(&mut request(Some(format!("Bearer {refresh}").as_str())))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(KindError::WrongKind { .. })));
    }

    #[test]
    fn require_role_checks_membership() {
        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());

        let mut agent = request(Some(bearer(&tokens, "u1", Role::Agent).as_str()));
        assert!(matches!(
            guard.require_role(&mut agent, &[Role::Admin]),
            Err(AuthError::InsufficientRole { role: Role::Agent })
        ));

        let mut agent = request(Some(bearer(&tokens, "u1", Role::Agent).as_str()));
        assert!(guard.require_role(&mut agent, &[Role::Agent, Role::Admin]).is_ok());
    }

    #[test]
    fn ownership_rules() {
        let admin = Identity::new("a1", Role::Admin);
        let client = Identity::new("c1", Role::Client);

        assert!(check_ownership(&admin, "someone-else"));
        assert!(check_ownership(&client, "c1"));
        assert!(!check_ownership(&client, "c2"));

        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());
        let mut req = request(Some(bearer(&tokens, "c1", Role::Client).as_str()));
        assert!(matches!(
            guard.require_ownership(&mut req, "c2"),
            Err(AuthError::NotOwner)
        ));
    }

    #[tokio::test]
    async fn rejected_role_never_invokes_handler() {
        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());
        let invoked = Arc::new(AtomicBool::new(false));

        let flag = invoked.clone();
        let mut router: Router<()> = Router::new();
        router
            .get(
                "/admin-only",
                guard.protect(Policy::Roles(&[Role::Admin]), move |_: (), _req: Request| {
                    let flag = flag.clone();
                    async move {
                        flag.store(true, Ordering::SeqCst);
                        Ok::<_, AppError>(Reply::ok("ran"))
                    }
                }),
            )
            .unwrap();

        let req = Request::new(Method::GET, "/admin-only")
            .with_header(AUTHORIZATION, &bearer(&tokens, "u1", Role::Agent));
        let res = router.dispatch((), req).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn owner_policy_reads_the_path_param() {
        let tokens = issuer();
        let guard = AccessGuard::new(tokens.clone());

        let mut router: Router<()> = Router::new();
        router
            .get(
                "/users/{id}",
                guard.protect(Policy::OwnerOf("id"), |_: (), req: Request| async move {
                    Ok::<_, AppError>(Reply::ok(req.identity()?.user_id.clone()))
                }),
            )
            .unwrap();

        let call = |path: &'static str, sub: &str, role: Role| {
            Request::new(Method::GET, path)
                .with_header(AUTHORIZATION, &bearer(&tokens, sub, role))
        };

        let own = router.dispatch((), call("/users/c1", "c1", Role::Client)).await;
        assert_eq!(own.status(), StatusCode::OK);

        let other = router.dispatch((), call("/users/c2", "c1", Role::Client)).await;
        assert_eq!(other.status(), StatusCode::FORBIDDEN);

        let admin = router.dispatch((), call("/users/c2", "a1", Role::Admin)).await;
        assert_eq!(admin.status(), StatusCode::OK);

        let anonymous = router.dispatch((), Request::new(Method::GET, "/users/c1")).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    }
}
