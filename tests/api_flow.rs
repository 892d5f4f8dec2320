use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use homes_api::app::build_app;
use homes_api::config::{AppEnv, Config};
use homes_api::repos::{InMemoryUserStore, NewUser, UserStore};
use homes_api::services::auth::{Role, build_token_issuer, hash_password};
use homes_api::state::AppState;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    app: axum::Router,
    users: Arc<InMemoryUserStore>,
}

struct Reply {
    status: StatusCode,
    headers: header::HeaderMap,
    body: Value,
}

impl TestApp {
    fn new(debug: bool) -> Self {
        Self::with_config(Config {
            app_debug: debug,
            jwt_secret: SECRET.to_string(),
            ..Config::default()
        })
    }

    fn with_config(config: Config) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let state = AppState::new(users.clone(), build_token_issuer(&config), config.app_debug);
        let app = build_app(state, &config).expect("app builds");
        Self { app, users }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let res = self.app.clone().oneshot(request).await.unwrap();

        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    async fn register(&self, email: &str, role: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "fullname": "Test User",
                "email": email,
                "password": "password123",
                "role": role,
            })),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Registers a user and returns (id, access token).
    async fn signed_up(&self, email: &str, role: &str) -> (String, String) {
        let res = self.register(email, role).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        (
            res.body["data"]["user"]["id"].as_str().unwrap().to_string(),
            res.body["data"]["tokens"]["access_token"]
                .as_str()
                .unwrap()
                .to_string(),
        )
    }

    /// Admins cannot self-register, so they are seeded through the store.
    async fn admin(&self) -> (String, String) {
        let admin = self
            .users
            .create(NewUser {
                fullname: "Admin".into(),
                email: "admin@example.com".into(),
                password_hash: hash_password("admin-password").unwrap(),
                role: Role::Admin,
                phone: None,
            })
            .await
            .unwrap();

        let res = self.login("admin@example.com", "admin-password").await;
        assert_eq!(res.status, StatusCode::OK);
        (
            admin.id.to_string(),
            res.body["data"]["tokens"]["access_token"]
                .as_str()
                .unwrap()
                .to_string(),
        )
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new(false);
    let res = app.call(Method::GET, "/api/health", None, None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "success");
    assert_eq!(res.body["message"], "API is running");
    assert_eq!(res.headers["x-content-type-options"], "nosniff");
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn register_login_me_refresh_flow() {
    let app = TestApp::new(false);

    let registered = app.register("Ada@Example.com", "agent").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["message"], "User registered successfully");
    assert_eq!(registered.body["data"]["user"]["email"], "ada@example.com");
    assert_eq!(registered.body["data"]["user"]["role"], "agent");
    assert!(registered.body["data"]["user"].get("password_hash").is_none());
    assert_eq!(registered.body["data"]["tokens"]["token_type"], "Bearer");
    assert_eq!(registered.body["data"]["tokens"]["expires_in"], 900);

    let login = app.login("ada@example.com", "password123").await;
    assert_eq!(login.status, StatusCode::OK);
    let access = login.body["data"]["tokens"]["access_token"].as_str().unwrap();
    let refresh = login.body["data"]["tokens"]["refresh_token"].as_str().unwrap();

    let me = app.call(Method::GET, "/api/users/me", Some(access), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], "ada@example.com");
    assert!(!me.body["data"]["last_login_at"].is_null());

    let refreshed = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    let new_access = refreshed.body["data"]["tokens"]["access_token"]
        .as_str()
        .unwrap();

    let me_again = app
        .call(Method::GET, "/api/users/me", Some(new_access), None)
        .await;
    assert_eq!(me_again.status, StatusCode::OK);

    // A refresh token is not a bearer credential.
    let wrong_kind = app.call(Method::GET, "/api/users/me", Some(refresh), None).await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_kind.body["message"], "Invalid or expired token");

    // And an access token cannot be used to refresh.
    let bad_refresh = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": access})),
        )
        .await;
    assert_eq!(bad_refresh.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad_refresh.body["message"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn missing_or_invalid_credentials_are_401() {
    let app = TestApp::new(false);

    let missing = app.call(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.body,
        json!({"status": "error", "message": "No token provided"})
    );

    let garbage = app
        .call(Method::GET, "/api/users/me", Some("a.b.c"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn unknown_endpoint_echoes_path() {
    let app = TestApp::new(false);
    let res = app.call(Method::GET, "/api/no/such/thing", None, None).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        res.body,
        json!({
            "status": "error",
            "message": "Endpoint not found",
            "path": "/api/no/such/thing",
        })
    );
}

#[tokio::test]
async fn options_is_always_ok() {
    let app = TestApp::new(false);
    let res = app.call(Method::OPTIONS, "/api/users/me", None, None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(res.body["status"], "success");
}

#[tokio::test]
async fn production_preflight_is_answered_by_the_dispatcher() {
    let app = TestApp::with_config(Config {
        app_env: AppEnv::Production,
        jwt_secret: SECRET.to_string(),
        cors_allowed_origins: vec!["https://homes.example".to_string()],
        ..Config::default()
    });

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/users/me")
        .header(header::ORIGIN, "https://elsewhere.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let res = app.send(preflight).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(res.body, json!({"status": "success", "message": "OK"}));
    assert!(res.headers.contains_key("x-request-id"));

    // Other methods still follow the allowlist.
    let listed = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "https://homes.example")
        .body(Body::empty())
        .unwrap();
    let res = app.send(listed).await;
    assert_eq!(
        res.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://homes.example"
    );

    let unlisted = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "https://elsewhere.example")
        .body(Body::empty())
        .unwrap();
    let res = app.send(unlisted).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!res.headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn admin_only_routes_reject_other_roles() {
    let app = TestApp::new(false);
    let (_, agent) = app.signed_up("agent@example.com", "agent").await;
    let (_, admin) = app.admin().await;

    let denied = app.call(Method::GET, "/api/users", Some(&agent), None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(
        denied.body,
        json!({"status": "error", "message": "Insufficient permissions"})
    );

    let listed = app.call(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["data"]["total"], 2);
}

#[tokio::test]
async fn users_by_id_require_ownership_or_admin() {
    let app = TestApp::new(false);
    let (alice_id, alice) = app.signed_up("alice@example.com", "client").await;
    let (bob_id, _) = app.signed_up("bob@example.com", "client").await;
    let (_, admin) = app.admin().await;

    let own = app
        .call(Method::GET, &format!("/api/users/{alice_id}"), Some(&alice), None)
        .await;
    assert_eq!(own.status, StatusCode::OK);

    let other = app
        .call(Method::GET, &format!("/api/users/{bob_id}"), Some(&alice), None)
        .await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let update_other = app
        .call(
            Method::PUT,
            &format!("/api/users/{bob_id}"),
            Some(&alice),
            Some(json!({"fullname": "Mallory"})),
        )
        .await;
    assert_eq!(update_other.status, StatusCode::FORBIDDEN);

    let by_admin = app
        .call(
            Method::PUT,
            &format!("/api/users/{bob_id}"),
            Some(&admin),
            Some(json!({"fullname": "Robert", "phone": "555-0101"})),
        )
        .await;
    assert_eq!(by_admin.status, StatusCode::OK);
    assert_eq!(by_admin.body["data"]["fullname"], "Robert");
    assert_eq!(by_admin.body["data"]["phone"], "555-0101");
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let app = TestApp::new(false);
    let (admin_id, admin) = app.admin().await;
    let (client_id, _) = app.signed_up("client@example.com", "client").await;

    for path in ["/api/users/me".to_string(), format!("/api/users/{admin_id}")] {
        let res = app.call(Method::DELETE, &path, Some(&admin), None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["message"], "Cannot delete yourself");
    }

    let deleted = app
        .call(Method::DELETE, &format!("/api/users/{client_id}"), Some(&admin), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app
        .call(Method::GET, &format!("/api/users/{client_id}"), Some(&admin), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_rules() {
    let app = TestApp::new(false);
    app.signed_up("taken@example.com", "client").await;

    let duplicate = app.register("TAKEN@example.com", "client").await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["message"], "Email already registered");

    let admin = app.register("boss@example.com", "admin").await;
    assert_eq!(admin.status, StatusCode::BAD_REQUEST);

    let missing = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({"email": "x@example.com"})),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        missing.body["message"],
        "Missing required fields: fullname, password"
    );
    assert_eq!(missing.body["errors"]["password"], "is required");
}

#[tokio::test]
async fn login_failures() {
    let app = TestApp::new(false);
    let (client_id, _) = app.signed_up("c@example.com", "client").await;
    let (_, admin) = app.admin().await;

    let wrong = app.login("c@example.com", "not-the-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid email or password");

    let unknown = app.login("nobody@example.com", "password123").await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body["message"], "Invalid email or password");

    let suspended = app
        .call(
            Method::PUT,
            &format!("/api/admin/users/{client_id}/status"),
            Some(&admin),
            Some(json!({"status": "suspended"})),
        )
        .await;
    assert_eq!(suspended.status, StatusCode::OK);
    assert_eq!(suspended.body["data"]["status"], "suspended");

    let blocked = app.login("c@example.com", "password123").await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);
    assert_eq!(blocked.body["message"], "Account is not active");
}

#[tokio::test]
async fn password_change_and_reset() {
    let app = TestApp::new(true);
    let (_, token) = app.signed_up("r@example.com", "client").await;

    let wrong_current = app
        .call(
            Method::PUT,
            "/api/users/me/password",
            Some(&token),
            Some(json!({"current_password": "nope-nope", "new_password": "changed-123"})),
        )
        .await;
    assert_eq!(wrong_current.status, StatusCode::BAD_REQUEST);

    let changed = app
        .call(
            Method::PUT,
            "/api/users/me/password",
            Some(&token),
            Some(json!({"current_password": "password123", "new_password": "changed-123"})),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(app.login("r@example.com", "changed-123").await.status, StatusCode::OK);

    let forgot = app
        .call(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({"email": "r@example.com"})),
        )
        .await;
    assert_eq!(forgot.status, StatusCode::OK);
    let reset_token = forgot.body["data"]["reset_token"].as_str().unwrap();

    // A reset token is not an access token.
    let as_bearer = app
        .call(Method::GET, "/api/users/me", Some(reset_token), None)
        .await;
    assert_eq!(as_bearer.status, StatusCode::UNAUTHORIZED);

    let reset = app
        .call(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({"token": reset_token, "new_password": "after-reset-1"})),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(app.login("r@example.com", "after-reset-1").await.status, StatusCode::OK);

    let bogus = app
        .call(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({"token": "x.y.z", "new_password": "after-reset-2"})),
        )
        .await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);
    assert_eq!(bogus.body["message"], "Invalid or expired reset token");
}

#[tokio::test]
async fn forgot_password_does_not_leak_outside_debug() {
    let app = TestApp::new(false);
    app.signed_up("quiet@example.com", "client").await;

    for email in ["quiet@example.com", "missing@example.com"] {
        let res = app
            .call(
                Method::POST,
                "/api/auth/forgot-password",
                None,
                Some(json!({"email": email})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.get("data").is_none());
    }
}

#[tokio::test]
async fn debug_route_listing_follows_the_flag() {
    let off = TestApp::new(false)
        .call(Method::GET, "/api/debug/routes", None, None)
        .await;
    assert_eq!(off.status, StatusCode::NOT_FOUND);

    let on = TestApp::new(true)
        .call(Method::GET, "/api/debug/routes", None, None)
        .await;
    assert_eq!(on.status, StatusCode::OK);
    let routes = on.body["data"].as_array().unwrap();
    assert!(routes.iter().any(|r| r["path"] == "/users/{id}"));
    assert!(routes.iter().any(|r| r["path"] == "/debug/routes"));
}
