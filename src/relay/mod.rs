//! Relay HTTP surface.
//!
//! A thin axum service between the chat client and the vendor AI API:
//!
//! - `POST /api/chat` forwards one chat turn, carrying the user's stored
//!   vendor conversation token and remembering the returned one
//! - `POST /api/reset` forgets the user's vendor conversation token
//! - `GET /api/health` reports liveness and whether a vendor credential is
//!   configured
//!
//! The vendor client and the session store are injected into [`AppState`]
//! as trait objects, so the router can be exercised in tests with a stub
//! vendor and a fresh in-memory store.

pub mod client;
pub mod session_store;

pub use session_store::{InMemorySessionStore, SessionStore};

use crate::conversation::now_rfc3339;
use crate::error::KondateError;
use crate::vendor::VendorClient;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the relay handlers
#[derive(Clone)]
pub struct AppState {
    vendor: Arc<dyn VendorClient>,
    sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Create relay state from a vendor client and a session store
    pub fn new(vendor: Arc<dyn VendorClient>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { vendor, sessions }
    }
}

/// Request body for POST /api/chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(rename = "userId", default)]
    user_id: String,
}

/// Response body for POST /api/chat
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    answer: String,
    #[serde(rename = "conversationId")]
    conversation_id: String,
    #[serde(rename = "messageId")]
    message_id: String,
}

/// Request body for POST /api/reset
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(rename = "userId", default)]
    user_id: String,
}

/// Response body for POST /api/reset
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    success: bool,
    message: String,
}

/// Response body for GET /api/health
#[derive(Debug, Serialize)]
pub struct Health {
    status: String,
    timestamp: String,
    #[serde(rename = "apiConfigured")]
    api_configured: bool,
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/reset", post(reset))
        .route("/api/health", get(health))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.is_empty() {
        return Err(ApiError::MissingMessage);
    }

    if !state.vendor.is_configured() {
        return Err(ApiError::MissingCredentials);
    }

    // Stored token, or empty string for a fresh vendor conversation.
    let token = state.sessions.get(&payload.user_id).unwrap_or_default();

    let reply = state
        .vendor
        .send_query(&payload.message, &payload.user_id, &token)
        .await
        .map_err(|err| match err.downcast_ref::<KondateError>() {
            Some(KondateError::VendorStatus { status, details }) => ApiError::Vendor {
                status: *status,
                details: details.clone(),
            },
            Some(KondateError::MissingCredentials(_)) => ApiError::MissingCredentials,
            _ => ApiError::Internal(err.to_string()),
        })?;

    if !reply.conversation_id.is_empty() {
        state.sessions.set(&payload.user_id, &reply.conversation_id);
    }

    Ok(Json(ChatResponse {
        answer: reply.answer,
        conversation_id: reply.conversation_id,
        message_id: reply.message_id,
    }))
}

async fn reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Json<ResetResponse> {
    if !payload.user_id.is_empty() {
        state.sessions.clear(&payload.user_id);
        info!("Cleared vendor conversation for user {}", payload.user_id);
    }

    Json(ResetResponse {
        success: true,
        message: "会話がリセットされました".to_string(),
    })
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: now_rfc3339(),
        api_configured: state.vendor.is_configured(),
    })
}

/// Errors surfaced by the relay handlers
#[derive(Debug)]
enum ApiError {
    /// Empty or missing message in the request body
    MissingMessage,
    /// No vendor credential configured
    MissingCredentials,
    /// The vendor API returned a non-success status
    Vendor { status: u16, details: String },
    /// Transport failure or malformed vendor payload
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingMessage => {
                let body = serde_json::json!({ "error": "メッセージが必要です" });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::MissingCredentials => {
                warn!("Chat request rejected: no vendor credential configured");
                let body = serde_json::json!({ "error": "APIキーが設定されていません" });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::Vendor { status, details } => {
                let body = serde_json::json!({
                    "error": "Dify APIエラー",
                    "details": details,
                });
                let status = StatusCode::from_u16(status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(body)).into_response()
            }
            ApiError::Internal(details) => {
                warn!("Relay internal error: {}", details);
                let body = serde_json::json!({
                    "error": "サーバーエラーが発生しました",
                    "details": details,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
