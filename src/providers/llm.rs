//! GenerationProvider — grounded query answering (C6/C7 step 4)

use crate::error::{CoreError, CoreResult};
use crate::retry::retry_with_backoff;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// `temperature` and `max_tokens` are request-scoped rather than fields
    /// on the provider, since RAGQueryEngine calls with a fixed low
    /// temperature (spec §4.6 step 4) while other callers may not.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> CoreResult<String>;
}

/// Talks to any OpenAI-chat-compatible `/chat/completions` endpoint,
/// matching the teacher's `OpenAICompatibleProvider` but non-streaming —
/// the Orchestrator needs the complete answer before it can compose sources.
pub struct OpenAICompatibleGenerationProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleGenerationProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl GenerationProvider for OpenAICompatibleGenerationProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> CoreResult<String> {
        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let payload: serde_json::Value = retry_with_backoff(|| async {
            let body = json!({
                "model": model,
                "messages": &messages,
                "temperature": temperature,
                "max_tokens": max_tokens,
                "stream": false,
            });

            let mut request = self
                .client
                .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
                .json(&body);
            if let Some(ref key) = self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await.map_err(CoreError::from)?;
            let response = response.error_for_status().map_err(CoreError::from)?;
            response.json().await.map_err(CoreError::from)
        })
        .await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CoreError::IntegrationPermanent("generation response missing content".to_string()))
    }
}
