// Valet Engine — Language Model Provider
// One concrete `LanguageModel`: Google Gemini over generateContent. The
// router and answer stage both go through this single bounded call; there
// is no streaming and no retry — a failed call is a failed stage.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::LanguageModel;
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        GeminiModel {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn generate(&self, prompt: &str) -> EngineResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}],
            }]
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            info!("[model] generateContent returned {status}");
            return Err(EngineError::capability(
                "model",
                format!("HTTP {status}: {}", detail.chars().take(200).collect::<String>()),
            ));
        }

        let data: Value = resp.json().await?;
        extract_text(&data)
            .ok_or_else(|| EngineError::capability("model", "response had no text parts"))
    }
}

/// Pull the first candidate's text parts out of a generateContent reply.
fn extract_text(data: &Value) -> Option<String> {
    let parts = data
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: Vec<&str> = parts.iter().filter_map(|p| p.get("text")?.as_str()).collect();
    if text.is_empty() {
        return None;
    }
    Some(text.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let data = json!({
            "candidates": [{
                "content": {
                    "parts": [{"text": "Hello"}, {"text": "world"}],
                    "role": "model",
                }
            }]
        });
        assert_eq!(extract_text(&data), Some("Hello\nworld".into()));
    }

    #[test]
    fn test_extract_text_empty_or_malformed() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!({"candidates": []})), None);
        let no_text = json!({
            "candidates": [{"content": {"parts": [{"inlineData": {}}]}}]
        });
        assert_eq!(extract_text(&no_text), None);
    }
}
