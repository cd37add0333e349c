//! Chat and welfare endpoints, nested under `/api`.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use carebridge_agent::TurnInput;
use carebridge_core::emotion::EmotionAnalysis;
use carebridge_core::message::{Message, Role};
use carebridge_core::retrieval::{DEFAULT_TOP_K, ProgramMatch};
use carebridge_core::state::AgentKind;

use crate::SharedState;

/// Upper bound on `n_results` for a welfare search.
const MAX_SEARCH_RESULTS: usize = 20;
/// Default page of history messages.
const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/chat/send", post(send_message_handler))
        .route("/chat/history/{session_id}", get(history_handler))
        .route("/chat/session/{session_id}", delete(end_session_handler))
        .route("/welfare/search", post(welfare_search_handler))
        .route("/welfare/categories", get(categories_handler))
}

// ── Request / Response types ──────────────────────────────────────────────

/// Body of `POST /api/chat/send`. `message` and `user_id` are required;
/// a request missing either is rejected with 422.
#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    user_id: String,
    /// Existing session (omit to start a new one).
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct AssistantMessage {
    id: String,
    session_id: String,
    user_id: String,
    role: Role,
    content: String,
    agent_type: AgentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<EmotionAnalysis>,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    message: AssistantMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<EmotionAnalysis>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    session_id: String,
    messages: Vec<Message>,
    total_count: usize,
}

#[derive(Serialize)]
struct SessionEndedResponse {
    status: &'static str,
    session_id: String,
    existed: bool,
}

#[derive(Deserialize)]
struct WelfareSearchRequest {
    query: String,
    #[serde(default = "default_n_results")]
    n_results: usize,
    #[serde(default)]
    category: Option<String>,
}

fn default_n_results() -> usize {
    DEFAULT_TOP_K
}

#[derive(Serialize)]
struct WelfareSearchResponse {
    query: String,
    results: Vec<ProgramMatch>,
    total: usize,
}

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!(context, error = %e, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{context}: {e}"),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn send_message_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    info!(
        user_id = %payload.user_id,
        message_len = payload.message.chars().count(),
        "chat/send request"
    );

    let mut input = TurnInput::new(payload.user_id.as_str(), payload.message);
    input.session_id = payload.session_id;
    let output = state.orchestrator.handle_turn(input).await;

    Json(ChatResponse {
        session_id: output.session_id.clone(),
        message: AssistantMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: output.session_id,
            user_id: payload.user_id,
            role: Role::Assistant,
            content: output.reply,
            agent_type: output.agent_type,
            emotion: output.emotion.clone(),
            created_at: Utc::now(),
        },
        emotion: output.emotion,
    })
}

async fn history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let record = state
        .memory
        .conversation(&session_id)
        .await
        .map_err(|e| internal_error("history lookup failed", e))?;

    let messages = record.map(|r| r.messages).unwrap_or_default();
    let total_count = messages.len();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let messages = messages[total_count.saturating_sub(limit)..].to_vec();

    Ok(Json(HistoryResponse {
        session_id,
        messages,
        total_count,
    }))
}

async fn end_session_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionEndedResponse>, ApiError> {
    let existed = state
        .memory
        .end_session(&session_id)
        .await
        .map_err(|e| internal_error("ending session failed", e))?;

    info!(session_id = %session_id, existed, "Session ended");
    Ok(Json(SessionEndedResponse {
        status: "session_ended",
        session_id,
        existed,
    }))
}

async fn welfare_search_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WelfareSearchRequest>,
) -> Result<Json<WelfareSearchResponse>, ApiError> {
    let top_k = payload.n_results.clamp(1, MAX_SEARCH_RESULTS);
    let category = payload.category.as_deref().filter(|c| !c.trim().is_empty());

    let results = state
        .retrieval
        .search(&payload.query, top_k, category)
        .await
        .map_err(|e| internal_error("welfare search failed", e))?;

    info!(query = %payload.query, results = results.len(), "Welfare search");
    Ok(Json(WelfareSearchResponse {
        query: payload.query,
        total: results.len(),
        results,
    }))
}

async fn categories_handler(State(state): State<SharedState>) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = state
        .retrieval
        .categories()
        .await
        .map_err(|e| internal_error("category listing failed", e))?;
    Ok(Json(CategoriesResponse { categories }))
}
