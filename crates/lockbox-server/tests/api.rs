//! End-to-end tests of the HTTP API against the in-memory store.
//!
//! Each test builds the full router and drives it in-process with
//! `tower::ServiceExt::oneshot`; no socket is opened.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use lockbox_core::{Vault, codec};
use lockbox_server::routes;
use lockbox_server::state::AppState;
use lockbox_storage::{MemoryStore, NewUser, Role};

const TOKEN_HEADER: &str = "X-Lockbox-Token";
const ADMIN_PASSWORD: &str = "admin-pw";

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestApp {
    async fn new() -> Self {
        let vault = Vault::new(Arc::new(MemoryStore::new()));
        let seed = NewUser {
            username: "admin".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Admin".to_owned(),
            password: ADMIN_PASSWORD.to_owned(),
            role: Role::Admin,
        };
        vault.bootstrap_admin(&seed).await.unwrap();
        Self {
            router: routes::router(Arc::new(AppState::new(vault))),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.json()["token"].as_str().unwrap().to_owned()
    }

    async fn admin(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    /// Provision `username` (password `<username>-pw`) and log in.
    async fn user(&self, admin: &str, username: &str) -> String {
        let reply = self
            .send(
                Method::POST,
                "/api/v1/user",
                Some(admin),
                Some(json!({
                    "username": username,
                    "first_name": format!("{username}-first"),
                    "last_name": format!("{username}-last"),
                    "password": format!("{username}-pw"),
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.json()["token"].is_string());
        self.login(username, &format!("{username}-pw")).await
    }
}

#[tokio::test]
async fn healthz_is_public() {
    let app = TestApp::new().await;
    let reply = app.send(Method::GET, "/healthz", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"OK");
}

#[tokio::test]
async fn security_headers_are_set() {
    let app = TestApp::new().await;
    let reply = app.send(Method::GET, "/healthz", None, None).await;
    assert_eq!(reply.headers["x-content-type-options"], "nosniff");
    assert_eq!(reply.headers["x-frame-options"], "DENY");
    assert_eq!(reply.headers["cache-control"], "no-store");
}

#[tokio::test]
async fn bad_login_is_401_without_detail() {
    let app = TestApp::new().await;
    let wrong = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({"username": "admin", "password": "nope"})),
        )
        .await;
    let unknown = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({"username": "ghost", "password": "nope"})),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
}

#[tokio::test]
async fn malformed_login_body_is_400() {
    let app = TestApp::new().await;
    let reply = app
        .send(Method::POST, "/login", None, Some(json!({"username": "admin"})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"], "bad_request");
}

#[tokio::test]
async fn missing_or_unknown_token_is_401() {
    let app = TestApp::new().await;
    let missing = app.send(Method::GET, "/api/v1/passwords", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .send(Method::GET, "/api/v1/passwords", Some("not-a-token"), None)
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body, unknown.body);
}

#[tokio::test]
async fn non_admin_is_403_on_admin_routes() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let alice = app.user(&admin, "alice").await;

    let list = app.send(Method::GET, "/api/v1/users", Some(&alice), None).await;
    assert_eq!(list.status, StatusCode::FORBIDDEN);

    let create = app
        .send(
            Method::POST,
            "/api/v1/user",
            Some(&alice),
            Some(json!({
                "username": "mallory",
                "first_name": "M",
                "last_name": "M",
                "password": "pw",
            })),
        )
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_lists_and_fetches_users() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    app.user(&admin, "alice").await;

    let list = app.send(Method::GET, "/api/v1/users", Some(&admin), None).await;
    assert_eq!(list.status, StatusCode::OK);
    let body = list.json();
    assert_eq!(body["count"], 2);
    let alice = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["first_name"] == "alice-first")
        .unwrap()
        .clone();
    assert!(alice.get("password").is_none());
    assert!(alice.get("token").is_none());

    let id = alice["id"].as_i64().unwrap();
    let one = app
        .send(Method::GET, &format!("/api/v1/user/{id}"), Some(&admin), None)
        .await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.json(), alice);

    let missing = app
        .send(Method::GET, "/api/v1/user/9999", Some(&admin), None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let bad_id = app
        .send(Method::GET, "/api/v1/user/abc", Some(&admin), None)
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_username_is_409() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    app.user(&admin, "alice").await;
    let reply = app
        .send(
            Method::POST,
            "/api/v1/user",
            Some(&admin),
            Some(json!({
                "username": "alice",
                "first_name": "A",
                "last_name": "B",
                "password": "pw",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn alice_fetches_her_32_byte_key() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let alice = app.user(&admin, "alice").await;

    let reply = app
        .send(Method::GET, "/api/v1/user/key/alice", Some(&alice), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let key = reply.json()["key"].as_str().unwrap().to_owned();
    assert_eq!(codec::decode(&key).unwrap().len(), 32);
}

#[tokio::test]
async fn key_of_another_user_is_403() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let alice = app.user(&admin, "alice").await;
    app.user(&admin, "bob").await;

    let reply = app
        .send(Method::GET, "/api/v1/user/key/bob", Some(&alice), None)
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn password_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let alice = app.user(&admin, "alice").await;

    let empty = app
        .send(Method::GET, "/api/v1/passwords", Some(&alice), None)
        .await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.json(), json!({"count": 0, "passwords": []}));

    let created = app
        .send(
            Method::POST,
            "/api/v1/password",
            Some(&alice),
            Some(json!({"name": "mail", "username": "alice@example.com", "password": "pw1"})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["name"], "mail");

    let read = app
        .send(Method::GET, "/api/v1/password/mail", Some(&alice), None)
        .await;
    assert_eq!(read.status, StatusCode::OK);
    let body = read.json();
    assert_eq!(body["name"], "mail");
    assert_eq!(body["username"], "alice@example.com");
    assert_eq!(body["password"], "pw1");
    assert!(body["id"].is_i64());

    let dup = app
        .send(
            Method::POST,
            "/api/v1/password",
            Some(&alice),
            Some(json!({"name": "mail", "username": "x", "password": "y"})),
        )
        .await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let updated = app
        .send(
            Method::PUT,
            "/api/v1/password/mail",
            Some(&alice),
            Some(json!({"username": "alice@example.com", "password": "pw2"})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json()["password"], "pw2");

    let list = app
        .send(Method::GET, "/api/v1/passwords", Some(&alice), None)
        .await;
    assert_eq!(list.json()["count"], 1);

    let deleted = app
        .send(Method::DELETE, "/api/v1/password/mail", Some(&alice), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app
        .send(Method::GET, "/api/v1/password/mail", Some(&alice), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tenants_cannot_see_each_other() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let alice = app.user(&admin, "alice").await;
    let bob = app.user(&admin, "bob").await;

    for (token, value) in [(&alice, "alice-secret"), (&bob, "bob-secret")] {
        let reply = app
            .send(
                Method::POST,
                "/api/v1/password",
                Some(token),
                Some(json!({"name": "shared", "username": "u", "password": value})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }
    app.send(
        Method::POST,
        "/api/v1/password",
        Some(&alice),
        Some(json!({"name": "private", "username": "u", "password": "p"})),
    )
    .await;

    let bob_view = app
        .send(Method::GET, "/api/v1/password/shared", Some(&bob), None)
        .await;
    assert_eq!(bob_view.json()["password"], "bob-secret");

    let hidden = app
        .send(Method::GET, "/api/v1/password/private", Some(&bob), None)
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let delete = app
        .send(Method::DELETE, "/api/v1/password/private", Some(&bob), None)
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let bob_list = app
        .send(Method::GET, "/api/v1/passwords", Some(&bob), None)
        .await
        .json();
    assert_eq!(bob_list["count"], 1);
}

#[tokio::test]
async fn empty_secret_name_is_400() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let alice = app.user(&admin, "alice").await;
    let reply = app
        .send(
            Method::POST,
            "/api/v1/password",
            Some(&alice),
            Some(json!({"name": "", "username": "u", "password": "p"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"], "bad_request");
}

#[tokio::test]
async fn token_rotation_invalidates_old_token() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let old = app.user(&admin, "alice").await;

    let reply = app
        .send(Method::POST, "/api/v1/token/rotate", Some(&old), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let fresh = reply.json()["token"].as_str().unwrap().to_owned();
    assert_ne!(fresh, old);

    let stale = app
        .send(Method::GET, "/api/v1/passwords", Some(&old), None)
        .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
    let ok = app
        .send(Method::GET, "/api/v1/passwords", Some(&fresh), None)
        .await;
    assert_eq!(ok.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_role_can_be_granted_at_creation() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let reply = app
        .send(
            Method::POST,
            "/api/v1/user",
            Some(&admin),
            Some(json!({
                "username": "ops",
                "first_name": "O",
                "last_name": "P",
                "password": "ops-pw",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let ops = app.login("ops", "ops-pw").await;
    let list = app.send(Method::GET, "/api/v1/users", Some(&ops), None).await;
    assert_eq!(list.status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = TestApp::new().await;
    let reply = app.send(Method::GET, "/nope", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"], "not_found");
}
