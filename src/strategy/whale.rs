//! Whale unit: follows concentrated flow.
//!
//! Ranks the universe by traded volume per unit of resting liquidity.
//! A high ratio means size has been moving through a thin book, which
//! is where informed money shows first. One large stake per round.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{MarketView, Proposal};
use crate::error::Result;

use super::{sized_cash, ProposalContext, Strategy};

#[derive(Debug, Clone)]
pub struct WhaleConfig {
    /// Entry window; extremes carry no edge worth the size
    pub min_entry_price: Decimal,
    pub max_entry_price: Decimal,
    /// Flow ratio below this is noise
    pub min_impact: Decimal,
    /// Large single stake
    pub bet_pct: Decimal,
}

impl Default for WhaleConfig {
    fn default() -> Self {
        Self {
            min_entry_price: dec!(0.40),
            max_entry_price: dec!(0.90),
            min_impact: dec!(2),
            bet_pct: dec!(0.08),
        }
    }
}

pub struct WhaleStrategy {
    config: WhaleConfig,
}

impl WhaleStrategy {
    pub fn new() -> Self {
        Self::with_config(WhaleConfig::default())
    }

    pub fn with_config(config: WhaleConfig) -> Self {
        Self { config }
    }

    /// Traded volume per unit of resting liquidity
    fn impact(market: &MarketView) -> Decimal {
        market.volume_usd / (market.liquidity_usd + Decimal::ONE)
    }
}

impl Default for WhaleStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for WhaleStrategy {
    fn id(&self) -> &str {
        "whale"
    }

    fn name(&self) -> &str {
        "Whale"
    }

    async fn propose(&self, ctx: &ProposalContext) -> Result<Vec<Proposal>> {
        let cash = sized_cash(ctx, self.config.bet_pct);
        if cash <= Decimal::ZERO {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<(&MarketView, Decimal)> = ctx
            .markets()
            .iter()
            .filter(|m| {
                m.price >= self.config.min_entry_price && m.price <= self.config.max_entry_price
            })
            .map(|m| (m, Self::impact(m)))
            .filter(|(_, impact)| *impact >= self.config.min_impact)
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.market_id.cmp(&b.0.market_id)));

        let (market, impact) = candidates[0];
        // Conviction scales with how far the ratio clears the floor,
        // saturating at three times the floor
        let span = impact.max(self.config.min_impact * dec!(3)) - self.config.min_impact;
        let over = if span > Decimal::ZERO {
            ((impact - self.config.min_impact) / span).min(Decimal::ONE)
        } else {
            Decimal::ONE
        };
        let confidence = (dec!(0.55) + over * dec!(0.35)).round_dp(4);
        let limit = market.best_ask.unwrap_or(market.price).min(dec!(0.99));

        Ok(vec![Proposal::buy(
            self.id(),
            market.market_id.clone(),
            cash,
            limit,
            confidence,
        )
        .with_question(market.question.clone())
        .with_rationale(format!(
            "flow ratio {} on ${} volume against ${} liquidity",
            impact.round_dp(2),
            market.volume_usd,
            market.liquidity_usd
        ))])
    }
}
