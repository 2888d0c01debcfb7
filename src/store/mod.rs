//! Persistence for users, one-time codes and served recommendations.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::{OtpPurpose, OtpRecord, RecommendationRecord, User};
pub use postgres::PgStore;

/// Store failures callers can act on; anything else is an internal error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(&'static str),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Fails with [`StoreError::Conflict`] when the email or username is
    /// already registered.
    async fn insert_user(&self, user: &User) -> anyhow::Result<()>;
    /// Returns `false` when no user has this email.
    async fn update_password(&self, email: &str, password_hash: &str) -> anyhow::Result<bool>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;

    /// Insert or replace the code for `otp.email`.
    async fn upsert_otp(&self, otp: &OtpRecord) -> anyhow::Result<()>;
    async fn find_otp(&self, email: &str) -> anyhow::Result<Option<OtpRecord>>;
    async fn mark_otp_verified(&self, email: &str) -> anyhow::Result<()>;
    async fn delete_otp(&self, email: &str) -> anyhow::Result<()>;

    async fn insert_recommendation(&self, rec: &RecommendationRecord) -> anyhow::Result<()>;
    /// Newest first.
    async fn list_recommendations(&self, user_id: Uuid)
        -> anyhow::Result<Vec<RecommendationRecord>>;
    async fn latest_recommendation(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RecommendationRecord>>;
}
