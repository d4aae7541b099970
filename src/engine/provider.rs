// TimeFlow Engine — AI Provider
// One OpenAI-compatible chat-completions client (DeepSeek-hosted by default)
// behind the `ChatProvider` trait so tests can script replies.
//
// Retry policy lives a level up: the pending queue re-attempts failed items
// on its fixed tick, so a provider call is a single HTTP attempt bounded by
// the client timeout. No backoff, no circuit breaker — a personal tool's
// queue IS its retry mechanism.

use crate::atoms::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::ChatMessage;
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

// ── Provider trait ─────────────────────────────────────────────────────────

/// The single seam between the pipeline and the outside AI.
/// Implementations return the assistant message content as raw text; shaping
/// that text into typed replies is the caller's job (see `parse_reply`).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> EngineResult<String>;
}

// ── DeepSeek (OpenAI-compatible) implementation ────────────────────────────

pub struct DeepSeekProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl DeepSeekProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        DeepSeekProvider {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl ChatProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> EngineResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        info!("[provider] Request to {} model={}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body_text = response.text().await.unwrap_or_default();
            error!(
                "[provider] API error {}: {}",
                status,
                truncate_utf8(&body_text, 500)
            );
            return Err(EngineError::provider(
                "deepseek",
                format!("API error {}: {}", status, truncate_utf8(&body_text, 200)),
            ));
        }

        let v: Value = response.json().await?;
        let content = v["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                EngineError::MalformedReply("reply carried no message content".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}

// ── Reply parsing ──────────────────────────────────────────────────────────

/// Parse the JSON object the model was instructed to return.
///
/// Models sometimes wrap the object in ``` fences or pad it with prose, so:
/// strip fences, slice from the first `{` to the last `}`, then parse
/// strictly into the expected shape. Any violation is a `MalformedReply` —
/// never a best-effort partial read.
pub(crate) fn parse_reply<T: DeserializeOwned>(content: &str) -> EngineResult<T> {
    let stripped = strip_code_fences(content);

    let start = stripped.find('{');
    let end = stripped.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s <= e => (s, e),
        _ => {
            return Err(EngineError::MalformedReply(format!(
                "no JSON object in reply: {}",
                truncate_utf8(stripped, 120)
            )))
        }
    };

    serde_json::from_str(&stripped[start..=end])
        .map_err(|e| EngineError::MalformedReply(format!("unexpected reply shape: {e}")))
}

/// Remove a leading/trailing triple-backtick fence (with optional language
/// tag) if present, leaving the inner text untouched otherwise.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag line ("json", "JSON", or nothing).
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Truncate to at most `max` bytes without splitting a UTF-8 sequence.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Test support ───────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One scripted provider turn.
    pub(crate) enum CannedReply {
        Content(String),
        TransportError,
        /// Never resolves within any sane timeout — exercises timeout paths.
        Hang,
    }

    /// Scripted provider: pops one canned reply per call and counts calls so
    /// tests can assert "no provider call was made".
    pub(crate) struct MockProvider {
        script: Mutex<VecDeque<CannedReply>>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        pub(crate) fn new() -> Self {
            MockProvider { script: Mutex::new(VecDeque::new()), calls: AtomicUsize::new(0) }
        }

        pub(crate) fn push(&self, reply: CannedReply) {
            self.script.lock().push_back(reply);
        }

        pub(crate) fn with(self, reply: CannedReply) -> Self {
            self.push(reply);
            self
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _temperature: f64,
            _max_tokens: u32,
        ) -> EngineResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            match next {
                Some(CannedReply::Content(s)) => Ok(s),
                Some(CannedReply::TransportError) => {
                    Err(EngineError::provider("mock", "connection refused"))
                }
                Some(CannedReply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(EngineError::provider("mock", "hang elapsed"))
                }
                None => Err(EngineError::provider("mock", "script exhausted")),
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::IntentReply;

    #[test]
    fn parse_reply_plain_json() {
        let reply: IntentReply =
            parse_reply(r#"{"type": "activity", "confidence": 0.9, "reasoning": "curto"}"#)
                .unwrap();
        assert_eq!(reply.confidence, 0.9);
    }

    #[test]
    fn parse_reply_fenced_json() {
        let content = "```json\n{\"type\": \"chat\", \"confidence\": 0.8}\n```";
        let reply: IntentReply = parse_reply(content).unwrap();
        assert!(matches!(reply.kind, crate::atoms::types::IntentType::Chat));
    }

    #[test]
    fn parse_reply_with_surrounding_prose() {
        let content = "Claro! Aqui está:\n{\"type\": \"question\", \"confidence\": 0.7}\nEspero que ajude.";
        let reply: IntentReply = parse_reply(content).unwrap();
        assert!(matches!(reply.kind, crate::atoms::types::IntentType::Question));
    }

    #[test]
    fn parse_reply_rejects_missing_object() {
        let err = parse_reply::<IntentReply>("desculpe, não entendi").unwrap_err();
        assert!(matches!(err, EngineError::MalformedReply(_)));
    }

    #[test]
    fn parse_reply_rejects_wrong_shape() {
        let err = parse_reply::<IntentReply>(r#"{"foo": 1}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedReply(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ação";
        // Byte 2 falls inside the two-byte "ç" sequence.
        assert_eq!(truncate_utf8(s, 2), "a");
        assert_eq!(truncate_utf8(s, 100), "ação");
    }
}
