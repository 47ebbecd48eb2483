//! Chat assistant endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use spt_common::identity::Identity;
use tracing::debug;

use crate::assistant;
use crate::error::{ApiJson, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Student asking; without a known student only the fallback answers
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

/// POST /api/deepseek/message
///
/// Stored records first, then the chat model, then the fixed response.
pub async fn chat_message(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let message = request.message.trim();

    let from_records = match Identity::parse(&request.email) {
        Ok(identity) if !message.is_empty() => state
            .store
            .read()
            .await?
            .records_for(&identity)
            .and_then(|records| assistant::record_answer(&records, message)),
        _ => None,
    };

    let response = match from_records {
        Some(answer) => {
            debug!("Chat answered from stored records");
            answer
        }
        None => state.assistant.fallback(message).await,
    };

    Ok(Json(ChatResponse {
        success: true,
        response,
    }))
}

/// GET /api/deepseek/message
pub async fn chat_fixed(State(state): State<AppState>) -> Json<ChatResponse> {
    Json(ChatResponse {
        success: true,
        response: state.assistant.fixed_response().to_string(),
    })
}
