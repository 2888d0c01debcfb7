//! Practice recommendations: dataset matching, the optional model bundle,
//! safety warnings and instruction steps.

use axum::Router;

use crate::state::AppState;

pub mod dataset;
pub mod dto;
pub mod handlers;
pub mod matcher;
pub mod ml;
pub mod safety;
pub mod service;
pub mod steps;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
