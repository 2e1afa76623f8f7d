#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use bms_service::config::{
    BmsConfig, ChapaConfig, MongoConfig, RateLimitConfig, SessionConfig, UploadConfig,
};
use bms_service::services::MongoDb;
use bms_service::{build_router, AppState};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::Value;
use tower::ServiceExt;

pub fn test_config(db_name: &str, chapa_base_url: &str) -> BmsConfig {
    BmsConfig {
        common: service_core::config::Config::default(),
        mongodb: MongoConfig {
            uri: std::env::var("TEST_MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: db_name.to_string(),
        },
        session: SessionConfig {
            ttl_hours: 24,
            cookie_secure: false,
        },
        uploads: UploadConfig {
            dir: std::env::temp_dir()
                .join(format!("bms-uploads-{}", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            max_bytes: 1024 * 1024,
        },
        chapa: ChapaConfig {
            base_url: chapa_base_url.to_string(),
            secret_key: Secret::new("CHASECK_TEST-secret".to_string()),
            callback_url: None,
            return_url: None,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
        },
        otlp_endpoint: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: MongoDb,
    pub db_name: String,
}

impl TestApp {
    /// Router over a lazily connected client: nothing touches MongoDB until a
    /// handler issues a query.
    pub async fn offline() -> Self {
        Self::build("http://127.0.0.1:9").await
    }

    /// Router over a fresh database with indexes, for tests that need MongoDB.
    pub async fn spawn() -> Self {
        Self::spawn_with_chapa("http://127.0.0.1:9").await
    }

    pub async fn spawn_with_chapa(chapa_base_url: &str) -> Self {
        let app = Self::build(chapa_base_url).await;
        app.db
            .initialize_indexes()
            .await
            .expect("Failed to create indexes");
        app
    }

    async fn build(chapa_base_url: &str) -> Self {
        let db_name = format!("bms_test_{}", uuid::Uuid::new_v4().simple());
        let config = test_config(&db_name, chapa_base_url);
        let db = MongoDb::connect(&config.mongodb.uri, &db_name)
            .await
            .expect("Failed to create MongoDB client");
        let router = build_router(AppState::new(config, db.clone()));
        Self {
            router,
            db,
            db_name,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed")
    }

    /// Send a JSON request, optionally with a session cookie, and decode the reply.
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.request(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Register a fresh organization and return its session cookie.
    pub async fn register(&self, organization: &str, email: &str) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({
                    "organizationName": organization,
                    "name": "Admin",
                    "email": email,
                    "password": "correct-horse-battery",
                })
                .to_string(),
            ))
            .unwrap();
        let response = self.request(request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        session_cookie(&response).expect("register did not set a session cookie")
    }

    pub async fn cleanup(&self) {
        self.db
            .database()
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}

/// `name=value` of the session cookie set by the response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("bms_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}
