//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - JSON API under `/api/v1/...`
/// - CORS (allow any origin/method/headers); adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/topics", get(http::http_get_topics))
        .route("/api/v1/problems", post(http::http_post_problem))
        .route("/api/v1/steps", post(http::http_post_steps))
        .route("/api/v1/check", post(http::http_post_check))
        .route("/api/v1/tests", post(http::http_post_test))
        .route("/api/v1/attempts/start", post(http::http_post_attempt_start))
        .route("/api/v1/attempts/advance", post(http::http_post_attempt_advance))
        .route("/api/v1/attempts/view", post(http::http_post_attempt_view))
        .route("/api/v1/attempts/finish", post(http::http_post_attempt_finish))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;

    fn app() -> Router {
        build_router(Arc::new(AppState::with_config(AppConfig::default())))
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_and_topics() {
        let (status, body) = call("GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (status, body) = call("GET", "/api/v1/topics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topics"][0]["id"], "geometric_ratio");
    }

    #[tokio::test]
    async fn problem_then_steps() {
        let (status, body) = call("POST", "/api/v1/problems", Some(json!({"topic_id": "rational_quadratic"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["problem"]["topic_id"], "rational_quadratic");
        assert!(body["statement"].as_str().unwrap().starts_with("sum_{k=1}^{oo}"));

        let (status, steps) = call("POST", "/api/v1/steps", Some(json!({"problem": body["problem"]}))).await;
        assert_eq!(status, StatusCode::OK);
        let keys: Vec<&str> = steps["steps"].as_array().unwrap().iter().map(|s| s["key"].as_str().unwrap()).collect();
        assert_eq!(keys, ["a_n", "s_n", "limit", "conv", "reason"]);
    }

    #[tokio::test]
    async fn check_endpoint_grades_symbolically() {
        let step = json!({"key": "sum", "kind": "input", "label": "S", "points": 2.0, "canonical_answer": "5/3"});
        let (_, ok) = call("POST", "/api/v1/check", Some(json!({"step": step, "value": "1 + 2/3"}))).await;
        assert_eq!(ok["ok"], true);
        assert_eq!(ok["score"], 2.0);
        let (_, bad) = call("POST", "/api/v1/check", Some(json!({"step": step, "value": "1.5"}))).await;
        assert_eq!(bad["ok"], false);
        assert_eq!(bad["correct"], "5/3");
    }

    #[tokio::test]
    async fn errors_map_to_status_codes() {
        let (status, body) = call("POST", "/api/v1/problems", Some(json!({"topic_id": "nope"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown_topic");

        let bad = json!({"topic_id": "rational_linear", "b": 1, "c": 2, "d": 4, "p": 1});
        let (status, body) = call("POST", "/api/v1/steps", Some(json!({"problem": bad}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_problem");
    }

    #[tokio::test]
    async fn attempt_lifecycle() {
        let (_, test) = call("POST", "/api/v1/tests", Some(json!({"topic_ids": ["geometric_ratio", "rational_linear"]}))).await;
        let questions = test["questions"].clone();
        let (_, start) = call("POST", "/api/v1/attempts/start", Some(json!({"questions": questions}))).await;
        let attempt = start["attempt"].clone();
        let question = questions[0].clone();

        let (status, body) = call(
            "POST",
            "/api/v1/attempts/advance",
            Some(json!({"question": question, "attempt": attempt, "key": "conv", "value": "converges"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "wrong_step");

        let first = question["steps"][0]["canonical_answer"].clone();
        let (status, body) = call(
            "POST",
            "/api/v1/attempts/advance",
            Some(json!({"question": question, "attempt": attempt, "value": first})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["next_step"], 1);
        let attempt = body["attempt"].clone();

        let (_, view) = call("POST", "/api/v1/attempts/view", Some(json!({"question": question, "attempt": attempt}))).await;
        assert_eq!(view["step_index"], 1);
        assert_eq!(view["step"]["key"], "s_n");
        assert_eq!(view["prev_allowed"], true);
        assert!(view["step"].get("canonical_answer").is_none());

        let (_, report) = call("POST", "/api/v1/attempts/finish", Some(json!({"questions": questions, "attempt": attempt}))).await;
        assert_eq!(report["total_points"], 2.0);
        assert_eq!(report["report"].as_array().unwrap().len(), 2);
    }
}
