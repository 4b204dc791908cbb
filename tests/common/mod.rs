#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tradeauth::api::AppState;
use tradeauth::config::{Config, Environment};
use tradeauth::db::{NewUser, Store};
use tradeauth::domain::Role;
use tradeauth::services::{CredentialStore, ManualClock, MemoryNotifier};

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<MemoryNotifier>,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut sidecar = self.db_path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(sidecar);
        }
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let db_path =
        std::env::temp_dir().join(format!("tradeauth-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::for_environment(Environment::Testing);
    config.general.database_url = format!("sqlite:{}", db_path.display());
    configure(&mut config);

    let store = Store::new(&config.general.database_url)
        .await
        .expect("failed to open store");

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let notifier = Arc::new(MemoryNotifier::new());

    let state = tradeauth::api::create_app_state_with(
        config,
        store,
        clock.clone(),
        notifier.clone(),
    )
    .expect("failed to create app state");

    let router = tradeauth::api::router(state.clone());

    TestApp {
        state,
        router,
        clock,
        notifier,
        db_path,
    }
}

impl TestApp {
    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, None, Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(token), None).await
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                serde_json::json!({
                    "email": email,
                    "username": username,
                    "password": password,
                    "first_name": "Test",
                    "last_name": "Trader",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Inserts an account directly, bypassing registration.
    pub async fn create_user(&self, email: &str, username: &str, password: &str, role: Role) {
        let credentials = CredentialStore::from_config(&self.state.config().security).unwrap();
        let password_hash = credentials.hash(password).unwrap();

        self.state
            .store()
            .users()
            .create(
                NewUser {
                    email: email.to_string(),
                    username: username.to_string(),
                    password_hash,
                    first_name: "Staff".to_string(),
                    last_name: "Member".to_string(),
                    role,
                    is_verified: true,
                },
                Utc::now(),
            )
            .await
            .unwrap();
    }
}

pub fn access_token(body: &Value) -> String {
    body["data"]["access_token"].as_str().unwrap().to_string()
}

pub fn refresh_token(body: &Value) -> String {
    body["data"]["refresh_token"].as_str().unwrap().to_string()
}
