//! Advisory layer: a second opinion between admission and execution.
//!
//! When enabled, every admitted proposal is shown to an advisor before it
//! reaches the gateway. The advisor may approve it, scale its stake down,
//! or veto it outright. Advisory failures never abort a round; the
//! configured [`FailPolicy`] decides whether an unreachable advisor lets
//! proposals through or blocks them.

pub mod llm;

pub use llm::LlmAdvisor;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::AdvisoryConfig;
use crate::domain::{MarketView, Proposal};
use crate::error::{GambitError, Result};

/// What the advisor decided about one proposal
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Proceed, with the reserved stake multiplied by `scale` in (0, 1]
    Approve { scale: Decimal },
    /// Do not execute
    Veto { reason: String },
}

impl Verdict {
    pub fn approve() -> Self {
        Verdict::Approve {
            scale: Decimal::ONE,
        }
    }
}

/// Behavior when the advisor times out or returns garbage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    /// Treat the proposal as approved at full stake
    #[default]
    Open,
    /// Treat the proposal as vetoed
    Closed,
}

impl FailPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailPolicy::Open => "open",
            FailPolicy::Closed => "closed",
        }
    }
}

impl std::fmt::Display for FailPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reviews admitted proposals before execution
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Judge one proposal. `market` is the snapshot row it targets, when
    /// still present.
    async fn review(&self, proposal: &Proposal, market: Option<&MarketView>) -> Result<Verdict>;
}

/// Minimal client for an OpenAI-compatible chat completion endpoint.
///
/// Shared by the advisor and the llm strategy unit. Authentication is
/// optional; when `LLM_API_KEY` is set it is sent as a bearer token, which
/// covers both local Ollama (ignores it) and hosted endpoints.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl ChatClient {
    pub fn new(cfg: &AdvisoryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST one chat completion and return the first choice's text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": false,
        });

        let mut request = self.http.post(&url).json(&body);
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            if !key.is_empty() {
                request = request.bearer_auth(key);
            }
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GambitError::AdvisoryTimeout
            } else {
                GambitError::Http(e)
            }
        })?;
        if !response.status().is_success() {
            return Err(GambitError::Advisory(format!(
                "chat endpoint returned {}",
                response.status()
            )));
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GambitError::Advisory("chat response had no choices".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Slice the first JSON object out of a chat reply.
///
/// Models wrap JSON in markdown fences or prose more often than not; the
/// outermost brace pair is the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
