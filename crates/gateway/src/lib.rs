//! HTTP API gateway for CareBridge.
//!
//! Exposes the turn pipeline, conversation history and welfare search over
//! REST. Built on Axum.
//!
//! - `GET  /`                               Service banner
//! - `GET  /health`                         Liveness
//! - `POST /api/chat/send`                  Run one turn
//! - `GET  /api/chat/history/{session_id}`  Stored session messages
//! - `DELETE /api/chat/session/{session_id}` End a session
//! - `POST /api/welfare/search`             Ranked welfare programs
//! - `GET  /api/welfare/categories`         Catalog categories

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use carebridge_agent::{Orchestrator, Runtime};
use carebridge_core::memory::MemoryGateway;
use carebridge_core::retrieval::RetrievalService;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub app_name: String,
    pub orchestrator: Arc<Orchestrator>,
    pub memory: Arc<dyn MemoryGateway>,
    pub retrieval: Arc<dyn RetrievalService>,
    pub start_time: DateTime<Utc>,
}

impl GatewayState {
    pub fn from_runtime(app_name: impl Into<String>, runtime: Runtime) -> Self {
        Self {
            app_name: app_name.into(),
            orchestrator: runtime.orchestrator,
            memory: runtime.memory,
            retrieval: runtime.retrieval,
            start_time: Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers: CORS restricted to `cors_origins`, 1 MB body limit, HTTP trace
/// logging.
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api", api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: carebridge_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let runtime = Runtime::from_config(&config)?;
    if !config.has_api_key() {
        warn!("No API key configured; every turn will fall back to safe replies");
    }
    info!(model = %runtime.model_label, "Pipeline built");

    let state = Arc::new(GatewayState::from_runtime(&config.app_name, runtime));
    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    name: String,
    version: &'static str,
    status: &'static str,
    message: &'static str,
}

async fn root_handler(State(state): State<SharedState>) -> Json<RootResponse> {
    Json(RootResponse {
        name: state.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        message: "AI 케어브릿지에 오신 것을 환영합니다!",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_secs: i64,
    active_sessions: usize,
    timestamp: DateTime<Utc>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy",
        service: "carebridge",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (now - state.start_time).num_seconds(),
        active_sessions: state.orchestrator.active_sessions(),
        timestamp: now,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::test_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let app = test_router(&[]);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["active_sessions"], 0);
    }

    #[tokio::test]
    async fn root_banner_names_the_service() {
        let app = test_router(&[]);

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "AI-CareBridge");
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let app = test_router(&[]);

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/chat/send")
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn cors_rejects_unknown_origin() {
        let app = test_router(&[]);

        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }
}
