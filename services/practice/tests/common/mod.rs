#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use practice::app::{AppState, build_router_with_prefix};
use practice::auth::policy::AdminAllowlist;
use practice::config::BootstrapConfig;
use practice::identity::local::LocalIdentityProvider;
use practice::notify::recording::RecordingNotifier;
use practice::store::memory::InMemoryKvStore;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";

pub type App = axum::routing::RouterIntoService<Body, ()>;

pub struct TestApp {
    pub app: App,
    pub store: InMemoryKvStore,
    pub identity: LocalIdentityProvider,
    pub notifier: RecordingNotifier,
}

pub struct TestAppBuilder {
    prefix: String,
    bootstrap: BootstrapConfig,
    admins: Vec<String>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            bootstrap: BootstrapConfig {
                enabled: true,
                token: None,
            },
            admins: vec![ADMIN_EMAIL.to_string()],
        }
    }
}

impl TestAppBuilder {
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn bootstrap(mut self, enabled: bool, token: Option<&str>) -> Self {
        self.bootstrap = BootstrapConfig {
            enabled,
            token: token.map(str::to_string),
        };
        self
    }

    pub fn build(self) -> TestApp {
        let store = InMemoryKvStore::new();
        let identity = LocalIdentityProvider::new("integration-secret", Duration::from_secs(600));
        let notifier = RecordingNotifier::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(identity.clone()),
            Arc::new(notifier.clone()),
            AdminAllowlist::new(self.admins),
            self.bootstrap,
        );
        TestApp {
            app: build_router_with_prefix(state, &self.prefix).into_service(),
            store,
            identity,
            notifier,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn authed_json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Sign up through the API and return a bearer token for the new account.
pub async fn sign_up_and_sign_in(app: &App, email: &str, name: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/signup",
            serde_json::json!({
                "email": email,
                "password": "correct horse",
                "data": { "name": name }
            }),
        ))
        .await
        .expect("signup");
    assert_eq!(response.status(), StatusCode::CREATED);
    sign_in(app, email, "correct horse").await
}

pub async fn sign_in(app: &App, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/token",
            serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .expect("token");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    body["accessToken"]
        .as_str()
        .expect("access token")
        .to_string()
}
