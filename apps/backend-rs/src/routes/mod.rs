use axum::{routing::get, Router};

use crate::state::AppState;

pub mod admin;
pub mod calendar;
pub mod catalog;
pub mod health;
pub mod inquiries;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(catalog::router())
        .merge(inquiries::router())
        .merge(calendar::router())
        .merge(admin::router())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        config::AppConfig,
        repository::{seed, LocalStore},
        state::AppState,
    };

    pub const ADMIN_KEY: &str = "test-admin-key";

    pub fn test_state() -> AppState {
        test_state_with(AppConfig::for_tests())
    }

    pub fn test_state_with(config: AppConfig) -> AppState {
        let store = LocalStore::in_memory(seed::demo_villas());
        AppState::with_store(config, Arc::new(store))
    }

    pub fn app(state: AppState) -> Router {
        Router::new()
            .nest("/v1", super::v1_router())
            .with_state(state)
    }

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    pub fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-key", ADMIN_KEY);
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request")
    }
}
