mod app;
mod auth;
mod chat;
mod config;
mod email;
mod error;
mod lenient;
mod recommend;
mod state;
mod stats;
mod store;

use crate::{app::build_app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "wellness=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    tracing::info!(
        dataset_rows = state.dataset.len(),
        ml_enabled = state.ml.is_some(),
        chat_enabled = state.chat.is_some(),
        "state ready"
    );

    app::serve(build_app(state)).await
}
