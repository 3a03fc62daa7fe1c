use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use blockbuilder::{AppState, Config, db, handlers};

/// A router backed by a throwaway database. The temp dir must outlive the
/// router or SQLite loses its file out from under the pool.
pub struct TestApp {
    pub router: Router,
    _dir: TempDir,
}

pub fn test_app() -> TestApp {
    let (state, dir) = test_state();
    TestApp {
        router: handlers::router(state),
        _dir: dir,
    }
}

pub fn test_state() -> (AppState, TempDir) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");

    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: db_path.to_string_lossy().into_owned(),
        license_key_prefix: "BB".to_string(),
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        rate_limit_replenish_secs: 9,
        rate_limit_burst: 100,
        verify_rate_limit_replenish_ms: 200,
        verify_rate_limit_burst: 300,
    };

    let pool = db::init_pool(&config.database_path).unwrap();
    db::run_migrations(&pool.get().unwrap()).unwrap();

    let state = AppState {
        db: pool,
        config: Arc::new(config),
    };

    (state, dir)
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.request_with_headers(method, path, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                builder.body(Body::from(json.to_string())).unwrap()
            }
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.request("DELETE", path, None).await
    }

    /// Create a license and return its key.
    pub async fn create_license(&self, email: &str, domain: &str, license_type: &str) -> String {
        let (status, body) = self
            .post(
                "/api/licenses/create",
                serde_json::json!({
                    "email": email,
                    "domain": domain,
                    "type": license_type,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["license"]["key"].as_str().unwrap().to_string()
    }

    pub async fn verify(&self, key: &str, domain: &str) -> (StatusCode, Value) {
        self.post(
            "/api/licenses/verify",
            serde_json::json!({ "key": key, "domain": domain }),
        )
        .await
    }
}
