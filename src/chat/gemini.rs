use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ChatClient;
use crate::config::ChatConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `generateContent` client. Tries the configured model, then the fallback
/// model when the first call fails.
pub struct GeminiClient {
    http: reqwest::Client,
    cfg: ChatConfig,
}

impl GeminiClient {
    pub fn new(cfg: ChatConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building chat http client")?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.cfg.base_url.trim_end_matches('/')
        )
    }

    async fn call(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
        let resp = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.cfg.api_key)
            .json(&request_body(prompt))
            .send()
            .await
            .with_context(|| format!("calling {model}"))?;

        let status = resp.status();
        let body: Value = resp.json().await.context("decoding chat response")?;
        if !status.is_success() {
            let reason = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("no error message");
            return Err(anyhow!("{model} returned {status}: {reason}"));
        }

        extract_text(&body).ok_or_else(|| anyhow!("Unable to extract response from API"))
    }
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        match self.call(&self.cfg.model, prompt).await {
            Ok(text) => Ok(text),
            Err(e) => {
                let Some(fallback) = &self.cfg.fallback_model else {
                    return Err(e);
                };
                warn!(error = %format!("{e:#}"), %fallback, "primary chat model failed");
                self.call(fallback, prompt).await
            }
        }
    }
}

pub fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "temperature": 0.7,
            "topP": 0.8,
            "topK": 40,
            "maxOutputTokens": 1024,
        }
    })
}

/// Reply text from the first response shape that carries one, trimmed.
pub fn extract_text(body: &Value) -> Option<String> {
    let found = [
        "/text",
        "/candidates/0/content/parts/0/text",
        "/candidates/0/text",
        "/parts/0/text",
    ]
    .iter()
    .find_map(|path| {
        body.pointer(path)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
    });
    if found.is_none() {
        debug!(%body, "no text in chat response");
    }
    found.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_text_from_each_response_shape() {
        assert_eq!(extract_text(&json!({"text": " hi "})).as_deref(), Some("hi"));
        assert_eq!(
            extract_text(&json!({
                "candidates": [{"content": {"parts": [{"text": "from parts"}]}}]
            }))
            .as_deref(),
            Some("from parts")
        );
        assert_eq!(
            extract_text(&json!({"candidates": [{"text": "candidate"}]})).as_deref(),
            Some("candidate")
        );
        assert_eq!(
            extract_text(&json!({"parts": [{"text": "bare"}]})).as_deref(),
            Some("bare")
        );
        assert_eq!(extract_text(&json!({"candidates": []})), None);
        assert_eq!(extract_text(&json!({"text": "   "})), None);
    }

    #[test]
    fn request_carries_generation_config() {
        let body = request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GeminiClient::new(ChatConfig {
            api_key: "k".into(),
            base_url: "https://example.test/".into(),
            model: "m1".into(),
            fallback_model: None,
        })
        .unwrap();
        assert_eq!(
            client.endpoint("m1"),
            "https://example.test/v1beta/models/m1:generateContent"
        );
    }
}
