#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An application wired to a fresh in-memory store
/// - Seeded users, one per role plus two employees
/// - JWT token generation
/// - API client helpers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskhub_shared::auth::jwt::{create_token, Claims, TokenType};
use taskhub_shared::auth::password::{hash_password, HashParams};
use taskhub_shared::models::user::{CreateUser, Role, User};
use taskhub_shared::store::memory::MemoryStore;
use taskhub_shared::store::EntityStore;
use tower::Service as _;
use uuid::Uuid;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Password every seeded user shares
pub const PASSWORD: &str = "MyP@ssw0rd!";

/// A seeded user and a valid access token for it
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn token(&self) -> Option<&str> {
        Some(&self.token)
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub admin: TestUser,
    pub manager: TestUser,

    /// Employee U1
    pub alice: TestUser,

    /// Employee U2
    pub bob: TestUser,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        password_hash: HashParams::fast(),
    }
}

pub fn access_token(user_id: Uuid) -> String {
    create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap()
}

async fn seed(store: &MemoryStore, username: &str, first: &str, last: &str, role: Role) -> TestUser {
    let user = store
        .create_user(CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role,
            profile_picture: None,
            password_hash: hash_password(PASSWORD, &HashParams::fast()).unwrap(),
        })
        .await
        .unwrap();

    TestUser {
        token: access_token(user.id),
        user,
    }
}

impl TestContext {
    /// Creates a new test context with a fresh store
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let admin = seed(&store, "root", "Ada", "Admin", Role::Admin).await;
        let manager = seed(&store, "mia", "Mia", "Manager", Role::Manager).await;
        let alice = seed(&store, "alice", "Alice", "Smith", Role::Employee).await;
        let bob = seed(&store, "bob", "", "", Role::Employee).await;

        let state = AppState::new(store.clone(), test_config());
        let app = build_router(state);

        TestContext {
            store,
            app,
            admin,
            manager,
            alice,
            bob,
        }
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, token, None).await
    }

    /// Creates a task as `owner`, returning its id
    pub async fn create_task(&self, owner: &TestUser, title: &str, assigned_to: &[Uuid]) -> Uuid {
        let (status, body) = self
            .post(
                "/v1/tasks",
                owner.token(),
                serde_json::json!({
                    "title": title,
                    "due_date": "2030-01-01T12:00:00Z",
                    "assigned_to": assigned_to,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        body["id"].as_str().unwrap().parse().unwrap()
    }
}

/// Ids of a JSON array of projections
pub fn ids(body: &Value) -> Vec<Uuid> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().parse().unwrap())
        .collect()
}
