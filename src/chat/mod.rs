//! Wellness companion chat backed by a generative-text API.

use async_trait::async_trait;
use axum::Router;

use crate::state::AppState;

pub mod gemini;
pub mod handlers;
pub mod prompt;

pub use gemini::GeminiClient;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Reply text for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

pub fn router() -> Router<AppState> {
    handlers::routes()
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Answers every prompt with a fixed reply and remembers the prompts.
    pub struct FixedChat {
        pub reply: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FixedChat {
        pub fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for FixedChat {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }
}
