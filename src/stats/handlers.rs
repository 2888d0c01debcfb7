use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use super::services::{compute_streaks, condition_counts, Streaks};
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/stats", get(user_stats))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/stats/conditions", get(condition_stats))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub streaks: Streaks,
}

#[derive(Debug, Serialize)]
pub struct ConditionStatsResponse {
    pub success: bool,
    pub data: BTreeMap<String, u64>,
}

/// Streaks use the UTC calendar date of each served recommendation.
#[instrument(skip(state))]
pub async fn user_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<StatsResponse>> {
    let dates: Vec<_> = state
        .store
        .list_recommendations(user_id)
        .await?
        .iter()
        .map(|r| r.created_at.date())
        .collect();
    let streaks = compute_streaks(&dates, OffsetDateTime::now_utc().date());
    Ok(Json(StatsResponse {
        success: true,
        streaks,
    }))
}

#[instrument(skip(state))]
pub async fn condition_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<ConditionStatsResponse>> {
    let users = state.store.list_users().await?;
    Ok(Json(ConditionStatsResponse {
        success: true,
        data: condition_counts(&users),
    }))
}
