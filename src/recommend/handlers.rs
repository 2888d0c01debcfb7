use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{HistoryResponse, RecommendRequest, RecommendResponse},
    service,
};
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/history", get(history))
}

#[instrument(skip(state, payload))]
pub async fn recommend(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecommendRequest>,
) -> ApiResult<Json<RecommendResponse>> {
    Ok(Json(service::recommend(&state, user_id, payload).await?))
}

/// Every recommendation served to the caller, newest first.
#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<HistoryResponse>> {
    let records = state.store.list_recommendations(user_id).await?;
    Ok(Json(HistoryResponse {
        success: true,
        records,
    }))
}
