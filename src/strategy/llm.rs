//! LLM unit: hands market selection to a chat model.
//!
//! The model sees the top of the snapshot plus open positions and picks
//! at most one trade per round. Everything it returns is distrusted:
//! stakes are clamped, indexes bounds-checked, sells verified against
//! holdings. A model that rambles instead of returning JSON simply
//! contributes nothing that round.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::advisory::{extract_json_object, ChatClient};
use crate::domain::{MarketView, Proposal, Side};
use crate::error::Result;

use super::{sized_cash, ProposalContext, Strategy};

const SYSTEM_PROMPT: &str = "You are one autonomous trading unit inside a swarm trading \
prediction markets. Reply with a single JSON object, nothing else: \
{\"action\": \"trade\" | \"pass\", \"market_index\": <1-based index>, \
\"side\": \"buy\" | \"sell\", \"bet_pct\": <fraction of cash>, \
\"confidence\": <number in [0, 1]>, \"reason\": \"<short>\"}. \
Pass when nothing looks mispriced.";

#[derive(Debug, Clone)]
pub struct LlmStrategyConfig {
    /// Decisions below this conviction are dropped
    pub min_confidence: Decimal,
    /// Hard cap on the model's requested stake
    pub max_bet_pct: Decimal,
    /// Stake used when the model names none
    pub default_bet_pct: Decimal,
    /// Markets shown in the prompt
    pub prompt_markets: usize,
}

impl Default for LlmStrategyConfig {
    fn default() -> Self {
        Self {
            min_confidence: dec!(0.55),
            max_bet_pct: dec!(0.20),
            default_bet_pct: dec!(0.05),
            prompt_markets: 10,
        }
    }
}

pub struct LlmStrategy {
    chat: Arc<ChatClient>,
    config: LlmStrategyConfig,
}

impl LlmStrategy {
    pub fn new(chat: Arc<ChatClient>) -> Self {
        Self::with_config(chat, LlmStrategyConfig::default())
    }

    pub fn with_config(chat: Arc<ChatClient>, config: LlmStrategyConfig) -> Self {
        Self { chat, config }
    }

    /// The slice of the universe the prompt enumerates; decisions index
    /// into this same slice
    fn prompt_slice<'a>(&self, ctx: &'a ProposalContext) -> &'a [MarketView] {
        let markets = ctx.markets();
        &markets[..markets.len().min(self.config.prompt_markets)]
    }

    fn render_prompt(&self, ctx: &ProposalContext) -> String {
        let mut prompt = format!(
            "Cash available: ${}\nRound: {}\n\nMarkets (index. question | mid | volume):\n",
            ctx.treasury.available_cash, ctx.round_id
        );
        for (i, market) in self.prompt_slice(ctx).iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. {} | mid {} | ${} volume",
                i + 1,
                market.question,
                market.price,
                market.volume_usd
            );
        }
        if !ctx.positions.is_empty() {
            prompt.push_str("\nOpen positions (market | shares | avg entry):\n");
            for position in &ctx.positions {
                let _ = writeln!(
                    prompt,
                    "- {} | {} | {}",
                    position.key.market_id, position.quantity, position.average_entry_price
                );
            }
        }
        prompt.push_str("\nPick at most one trade this round, or pass.");
        prompt
    }

    /// Turn a model reply into at most one proposal.
    ///
    /// Refusing a decision is never an error; the unit just sits the
    /// round out.
    fn decide_from_text(&self, ctx: &ProposalContext, text: &str) -> Vec<Proposal> {
        let Some(raw) = extract_json_object(text) else {
            warn!(round_id = ctx.round_id, "llm reply carried no JSON object");
            return Vec::new();
        };
        let decision: ModelDecision = match serde_json::from_str(raw) {
            Ok(d) => d,
            Err(e) => {
                warn!(round_id = ctx.round_id, error = %e, "llm decision failed to parse");
                return Vec::new();
            }
        };

        if !decision.action.eq_ignore_ascii_case("trade") {
            debug!(round_id = ctx.round_id, "llm passed this round");
            return Vec::new();
        }

        let markets = self.prompt_slice(ctx);
        let market = match decision.market_index {
            Some(i) if (1..=markets.len()).contains(&i) => &markets[i - 1],
            other => {
                warn!(round_id = ctx.round_id, index = ?other, "llm picked an index outside the prompt");
                return Vec::new();
            }
        };
        let side = match decision.side.as_deref().map(str::parse::<Side>) {
            Some(Ok(side)) => side,
            _ => {
                warn!(round_id = ctx.round_id, "llm decision missing a usable side");
                return Vec::new();
            }
        };
        let confidence = decision.confidence.unwrap_or(Decimal::ZERO);
        if confidence < self.config.min_confidence {
            debug!(round_id = ctx.round_id, %confidence, "llm conviction below floor");
            return Vec::new();
        }
        let confidence = confidence.min(Decimal::ONE);

        let rationale = decision
            .reason
            .unwrap_or_else(|| "model gave no reason".to_string());

        let proposal = match side {
            Side::Buy => {
                let bet_pct = decision
                    .bet_pct
                    .unwrap_or(self.config.default_bet_pct)
                    .min(self.config.max_bet_pct);
                let cash = sized_cash(ctx, bet_pct);
                if cash <= Decimal::ZERO {
                    return Vec::new();
                }
                let limit = market.best_ask.unwrap_or(market.price).min(dec!(0.99));
                Proposal::buy(self.id(), market.market_id.clone(), cash, limit, confidence)
            }
            Side::Sell => {
                let held = ctx.held_quantity(&market.market_id);
                if held <= Decimal::ZERO {
                    warn!(round_id = ctx.round_id, market_id = %market.market_id, "llm tried to sell an unheld market");
                    return Vec::new();
                }
                let limit = market.best_bid.unwrap_or(market.price).max(dec!(0.01));
                Proposal::sell(self.id(), market.market_id.clone(), held, limit, confidence)
            }
        };

        vec![proposal
            .with_question(market.question.clone())
            .with_rationale(rationale)]
    }
}

#[async_trait]
impl Strategy for LlmStrategy {
    fn id(&self) -> &str {
        "llm"
    }

    fn name(&self) -> &str {
        "LLM"
    }

    async fn propose(&self, ctx: &ProposalContext) -> Result<Vec<Proposal>> {
        if ctx.snapshot.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = self.render_prompt(ctx);
        let reply = self.chat.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(self.decide_from_text(ctx, &reply))
    }
}

#[derive(Debug, Deserialize)]
struct ModelDecision {
    action: String,
    #[serde(default)]
    market_index: Option<usize>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    bet_pct: Option<Decimal>,
    #[serde(default)]
    confidence: Option<Decimal>,
    #[serde(default)]
    reason: Option<String>,
}
