use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use super::prompt::{build_prompt, HistoryMessage, PromptParts};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/chatbot", post(chatbot))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<HistoryMessage>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

/// Signing in is optional; a signed-in caller's profile and latest
/// recommendation are added to the prompt.
#[instrument(skip(state, payload, auth))]
pub async fn chatbot(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    let Some(chat) = state.chat.clone() else {
        return Err(ApiError::Upstream(
            "Chatbot model not available. Please check API key and model availability.".into(),
        ));
    };

    let (user, latest) = match auth {
        Some(AuthUser(user_id)) => (
            state.store.find_user_by_id(user_id).await?,
            state.store.latest_recommendation(user_id).await?,
        ),
        None => (None, None),
    };

    let prompt = build_prompt(&PromptParts {
        message,
        language: payload.language.as_deref().unwrap_or("en"),
        history: &payload.conversation_history,
        user: user.as_ref(),
        latest: latest.as_ref(),
    });

    let reply = chat.generate(&prompt).await.map_err(|e| {
        error!(error = %format!("{e:#}"), "chat generation failed");
        ApiError::Upstream(format!("API Error: {e}"))
    })?;

    Ok(Json(ChatResponse {
        success: true,
        response: reply,
    }))
}
