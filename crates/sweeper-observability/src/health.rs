//! `/healthz`, `/readyz`, `/metrics` router (spec.md §6, §10.4).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};

use crate::metrics::Metrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Flipped to `true` after the Scheduler completes its first cycle, or left
/// pre-set to `true` when the daemon is configured to skip that wait
/// (spec.md §10.4).
pub trait ReadinessChecker: Send + Sync {
    fn is_ready(&self) -> bool;
}

/// Hook back into the running daemon for the `/trigger` and `/reload` HTTP
/// endpoints (spec.md §6's "hooks the core exports ... wired to the
/// manual-trigger signal channel"). Implemented by the daemon binary, which
/// is the only thing that holds a `SchedulerHandle`.
pub trait CycleControl: Send + Sync {
    fn trigger(&self);
    fn reload(&self);
}

/// Default checker backed by a shared flag the Scheduler flips.
pub struct CycleReadiness(Arc<AtomicBool>);

impl CycleReadiness {
    pub fn new(skip_wait: bool) -> Self {
        Self(Arc::new(AtomicBool::new(skip_wait)))
    }

    pub fn handle(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ReadinessChecker for CycleReadiness {
    fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<Metrics>,
    pub readiness_checker: Option<Arc<dyn ReadinessChecker>>,
    pub control: Option<Arc<dyn CycleControl>>,
}

impl HealthState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics, readiness_checker: None, control: None }
    }

    pub fn with_readiness_checker(metrics: Arc<Metrics>, readiness_checker: Arc<dyn ReadinessChecker>) -> Self {
        Self { metrics, readiness_checker: Some(readiness_checker), control: None }
    }

    /// Chainable: attaches the `/trigger` and `/reload` hook.
    pub fn with_control(mut self, control: Arc<dyn CycleControl>) -> Self {
        self.control = Some(control);
        self
    }
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .route("/trigger", axum::routing::post(trigger_handler))
        .route("/reload", axum::routing::post(reload_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".to_string() })
}

async fn readyz(State(state): State<HealthState>) -> Response {
    let ready = state.readiness_checker.as_ref().map(|c| c.is_ready()).unwrap_or(true);

    if ready {
        (StatusCode::OK, Json(ReadinessResponse { status: "ready".to_string(), message: None })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                message: Some("no cleanup cycle has completed yet".to_string()),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: String,
}

async fn trigger_handler(State(state): State<HealthState>) -> Response {
    match &state.control {
        Some(control) => {
            control.trigger();
            (StatusCode::ACCEPTED, Json(ActionResponse { status: "triggered".to_string() })).into_response()
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, Json(ActionResponse { status: "no_control_hook".to_string() })).into_response(),
    }
}

async fn reload_handler(State(state): State<HealthState>) -> Response {
    match &state.control {
        Some(control) => {
            control.reload();
            (StatusCode::ACCEPTED, Json(ActionResponse { status: "reloading".to_string() })).into_response()
        }
        None => (StatusCode::SERVICE_UNAVAILABLE, Json(ActionResponse { status: "no_control_hook".to_string() })).into_response(),
    }
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (StatusCode::OK, [("Content-Type", "text/plain; version=0.0.4")], body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to encode metrics: {err}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn healthz_always_returns_ok() {
        let state = HealthState::new(Arc::new(Metrics::new().unwrap()));
        let app = health_router(state);

        let response = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_without_checker_defaults_to_ready() {
        let state = HealthState::new(Arc::new(Metrics::new().unwrap()));
        let app = health_router(state);

        let response = app.oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readyz_reports_not_ready_before_first_cycle() {
        let checker = Arc::new(CycleReadiness::new(false));
        let state = HealthState::with_readiness_checker(Arc::new(Metrics::new().unwrap()), checker);
        let app = health_router(state);

        let response = app.oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readyz_flips_ready_after_mark_ready() {
        let checker = Arc::new(CycleReadiness::new(false));
        checker.mark_ready();
        let state = HealthState::with_readiness_checker(Arc::new(Metrics::new().unwrap()), checker);
        let app = health_router(state);

        let response = app.oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text_format() {
        let state = HealthState::new(Arc::new(Metrics::new().unwrap()));
        let app = health_router(state);

        let response = app.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain; version=0.0.4");
    }

    struct CountingControl {
        triggers: std::sync::atomic::AtomicUsize,
        reloads: std::sync::atomic::AtomicUsize,
    }

    impl CycleControl for CountingControl {
        fn trigger(&self) {
            self.triggers.fetch_add(1, Ordering::SeqCst);
        }
        fn reload(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn trigger_without_control_hook_returns_service_unavailable() {
        let state = HealthState::new(Arc::new(Metrics::new().unwrap()));
        let app = health_router(state);

        let response = app.oneshot(Request::builder().method("POST").uri("/trigger").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn trigger_and_reload_invoke_the_control_hook() {
        let control = Arc::new(CountingControl {
            triggers: std::sync::atomic::AtomicUsize::new(0),
            reloads: std::sync::atomic::AtomicUsize::new(0),
        });
        let state = HealthState::new(Arc::new(Metrics::new().unwrap())).with_control(control.clone());
        let app = health_router(state);

        let response = app
            .clone()
            .oneshot(Request::builder().method("POST").uri("/trigger").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = app
            .oneshot(Request::builder().method("POST").uri("/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        assert_eq!(control.triggers.load(Ordering::SeqCst), 1);
        assert_eq!(control.reloads.load(Ordering::SeqCst), 1);
    }
}
