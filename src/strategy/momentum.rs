//! Momentum unit: buys strength.
//!
//! Markets already trading at a firm "yes" price tend to keep drifting
//! toward resolution. The unit buys mids inside its entry band, paying up
//! to the ask, with conviction growing the deeper into the band the mid
//! sits.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::domain::Proposal;
use crate::error::Result;

use super::{sized_cash, ProposalContext, Strategy};

#[derive(Debug, Clone)]
pub struct MomentumConfig {
    /// Lowest mid considered to be moving
    pub min_entry_price: Decimal,
    /// Highest mid still worth paying for
    pub max_entry_price: Decimal,
    /// Fraction of available cash per proposal
    pub bet_pct: Decimal,
    /// Probability of playing a given round
    pub participation: f64,
    pub max_proposals: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            min_entry_price: dec!(0.65),
            max_entry_price: dec!(0.95),
            bet_pct: dec!(0.05),
            participation: 0.85,
            max_proposals: 2,
        }
    }
}

pub struct MomentumStrategy {
    config: MomentumConfig,
}

impl MomentumStrategy {
    pub fn new() -> Self {
        Self::with_config(MomentumConfig::default())
    }

    pub fn with_config(config: MomentumConfig) -> Self {
        Self { config }
    }
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    fn id(&self) -> &str {
        "momentum"
    }

    fn name(&self) -> &str {
        "Momentum"
    }

    async fn propose(&self, ctx: &ProposalContext) -> Result<Vec<Proposal>> {
        let mut rng = ctx.rng(self.id());
        if rng.gen::<f64>() > self.config.participation {
            debug!(round_id = ctx.round_id, "momentum sitting this round out");
            return Ok(Vec::new());
        }

        let cash = sized_cash(ctx, self.config.bet_pct);
        if cash <= Decimal::ZERO {
            return Ok(Vec::new());
        }

        let band = self.config.max_entry_price - self.config.min_entry_price;
        let mut out = Vec::new();
        for market in ctx.markets() {
            if out.len() >= self.config.max_proposals {
                break;
            }
            if market.price <= self.config.min_entry_price
                || market.price >= self.config.max_entry_price
            {
                continue;
            }

            // Conviction grows with how deep into the band the mid sits
            let progress = (market.price - self.config.min_entry_price) / band;
            let confidence = (dec!(0.55) + progress * dec!(0.35)).round_dp(4);
            // Cross the spread rather than rest and miss
            let limit = market.best_ask.unwrap_or(market.price).min(dec!(0.99));

            out.push(
                Proposal::buy(self.id(), market.market_id.clone(), cash, limit, confidence)
                    .with_question(market.question.clone())
                    .with_rationale(format!(
                        "mid {} inside entry band {}..{}",
                        market.price, self.config.min_entry_price, self.config.max_entry_price
                    )),
            );
        }
        Ok(out)
    }
}
