//! LLM-backed advisor speaking to any OpenAI-compatible chat endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{MarketView, Proposal};
use crate::error::{GambitError, Result};

use super::{extract_json_object, Advisor, ChatClient, Verdict};

const SYSTEM_PROMPT: &str = "You are the risk reviewer for a prediction-market trading desk. \
You receive one proposed trade at a time and reply with a single JSON object, nothing else: \
{\"verdict\": \"approve\" | \"veto\", \"scale\": <number in (0, 1], optional>, \"reason\": \"<short>\"}. \
Use \"scale\" below 1 to shrink a stake you consider oversized.";

/// Advisor that asks a chat model for a verdict on each proposal
pub struct LlmAdvisor {
    chat: Arc<ChatClient>,
}

impl LlmAdvisor {
    pub fn new(chat: Arc<ChatClient>) -> Self {
        Self { chat }
    }

    fn render_prompt(proposal: &Proposal, market: Option<&MarketView>) -> String {
        let market_line = match market {
            Some(m) => format!(
                "Current mid: {} | volume ${} | liquidity ${}",
                m.price, m.volume_usd, m.liquidity_usd
            ),
            None => "Market no longer present in the snapshot".to_string(),
        };
        format!(
            r#"Review this proposed trade:

Strategy: {}
Market: {}
Question: {}
Side: {}
Amount: {}
Target price: {}
Stated confidence: {}
Rationale: {}
{}

Veto trades with thin rationale, pricing far from the mid, or outsized stakes."#,
            proposal.strategy_id,
            proposal.market_id,
            proposal.question,
            proposal.side,
            proposal.requested_amount,
            proposal.target_price,
            proposal.confidence,
            proposal.rationale,
            market_line,
        )
    }

    /// Parse a model reply into a verdict. Pure; failures carry the cause.
    fn parse_verdict(text: &str) -> Result<Verdict> {
        let raw = extract_json_object(text)
            .ok_or_else(|| GambitError::Advisory("no JSON object in reply".to_string()))?;
        let reply: AdvisorReply = serde_json::from_str(raw)
            .map_err(|e| GambitError::Advisory(format!("malformed verdict: {e}")))?;

        match reply.verdict.to_ascii_lowercase().as_str() {
            "approve" => {
                let scale = reply.scale.unwrap_or(Decimal::ONE);
                if scale <= Decimal::ZERO || scale > Decimal::ONE {
                    return Err(GambitError::Advisory(format!(
                        "scale {scale} outside (0, 1]"
                    )));
                }
                Ok(Verdict::Approve { scale })
            }
            "veto" => Ok(Verdict::Veto {
                reason: reply
                    .reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            }),
            other => Err(GambitError::Advisory(format!(
                "unknown verdict {other:?}"
            ))),
        }
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn review(&self, proposal: &Proposal, market: Option<&MarketView>) -> Result<Verdict> {
        let prompt = Self::render_prompt(proposal, market);
        debug!(
            proposal_id = %proposal.proposal_id,
            model = self.chat.model(),
            "requesting advisory verdict"
        );
        let reply = self.chat.complete(SYSTEM_PROMPT, &prompt).await?;
        Self::parse_verdict(&reply)
    }
}

#[derive(Debug, Deserialize)]
struct AdvisorReply {
    verdict: String,
    #[serde(default)]
    scale: Option<Decimal>,
    #[serde(default)]
    reason: Option<String>,
}
