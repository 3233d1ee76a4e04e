//! Chat-completion backend for the external responder.
//!
//! [`OpenAICompletion`] calls an OpenAI-compatible
//! `POST {base_url}/chat/completions` endpoint. Retrieved knowledge items are
//! sent as context in a system message after a fixed support-oriented
//! persona prompt.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Failures surface as `Err` to the responder, which turns them into a
//! user-visible notice and a rule-based reply.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use solace_core::{Completion, CompletionRequest, KnowledgeItem};

use crate::config::ResponderConfig;

const SYSTEM_PROMPT: &str = "You are a warm, supportive listener for students. \
Reply in a few short sentences. Acknowledge how the person feels, offer gentle, \
practical ideas, and never diagnose, label conditions, or recommend medication. \
If the person seems to be in distress, encourage them to reach out to someone \
they trust or a support service.";

pub struct OpenAICompletion {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAICompletion {
    /// Create a backend from the `[responder]` config.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set or the API key variable is
    /// missing or empty.
    pub fn new(config: &ResponderConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("responder.model required for OpenAI provider"))?;

        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;
        if api_key.trim().is_empty() {
            bail!("{} environment variable is empty", config.api_key_env);
        }

        // Per attempt; the session layer bounds the call as a whole
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Completion for OpenAICompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Option<String>> {
        let body = build_request_body(&self.model, self.temperature, &request);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_completion_response(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        tracing::debug!(%status, attempt, "completion request will be retried");
                        last_err = Some(anyhow::anyhow!(
                            "Completion API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    // Client error (not 429): fail now
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Completion API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Completion failed after retries")))
    }
}

fn format_context(items: &[KnowledgeItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[{}] Q: {}\nA: {}", i + 1, item.question, item.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the chat-completions JSON body.
fn build_request_body(model: &str, temperature: f32, request: &CompletionRequest<'_>) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];

    if !request.context.is_empty() {
        messages.push(json!({
            "role": "system",
            "content": format!(
                "Reference answers that may help:\n\n{}",
                format_context(request.context)
            ),
        }));
    }

    let c = request.classification;
    if !c.is_general() || !c.topics.is_empty() {
        messages.push(json!({
            "role": "system",
            "content": format!(
                "Detected feelings: {}. Topics: {}.",
                c.emotions.join(", "),
                if c.topics.is_empty() { "none".to_string() } else { c.topics.join(", ") }
            ),
        }));
    }

    messages.push(json!({ "role": "user", "content": request.text }));

    json!({
        "model": model,
        "temperature": temperature,
        "messages": messages,
    })
}

/// Extract `choices[0].message.content`; blank content means no answer.
fn parse_completion_response(json: &Value) -> Result<Option<String>> {
    let choices = json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing choices array"))?;

    let content = choices
        .first()
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(content)
}
