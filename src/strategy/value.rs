//! Value unit: longshot hunter.
//!
//! Scatters small stakes across deep longshots where a single hit pays
//! for many misses, and closes winners once the market prices them as
//! near-certain.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::Proposal;
use crate::error::Result;

use super::{sized_cash, ProposalContext, Strategy};

#[derive(Debug, Clone)]
pub struct ValueConfig {
    /// Highest mid that still counts as a longshot
    pub max_longshot_price: Decimal,
    /// Mids below this are presumed dead, not cheap
    pub min_longshot_price: Decimal,
    /// Held positions at or above this mid get closed
    pub take_profit_price: Decimal,
    /// Small stake per longshot
    pub bet_pct: Decimal,
    pub max_proposals: usize,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self {
            max_longshot_price: dec!(0.10),
            min_longshot_price: dec!(0.02),
            take_profit_price: dec!(0.90),
            bet_pct: dec!(0.02),
            max_proposals: 3,
        }
    }
}

pub struct ValueStrategy {
    config: ValueConfig,
}

impl ValueStrategy {
    pub fn new() -> Self {
        Self::with_config(ValueConfig::default())
    }

    pub fn with_config(config: ValueConfig) -> Self {
        Self { config }
    }
}

impl Default for ValueStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for ValueStrategy {
    fn id(&self) -> &str {
        "value"
    }

    fn name(&self) -> &str {
        "Value"
    }

    async fn propose(&self, ctx: &ProposalContext) -> Result<Vec<Proposal>> {
        let mut out = Vec::new();

        // Close winners priced as near-certain; the last few cents are not
        // worth the resolution risk
        for market in ctx.markets() {
            if out.len() >= self.config.max_proposals {
                break;
            }
            let held = ctx.held_quantity(&market.market_id);
            if held <= Decimal::ZERO || market.price < self.config.take_profit_price {
                continue;
            }
            let limit = market.best_bid.unwrap_or(market.price).max(dec!(0.01));
            out.push(
                Proposal::sell(self.id(), market.market_id.clone(), held, limit, dec!(0.80))
                    .with_question(market.question.clone())
                    .with_rationale(format!(
                        "closing near-certain winner at mid {}",
                        market.price
                    )),
            );
        }

        let cash = sized_cash(ctx, self.config.bet_pct);
        if cash > Decimal::ZERO {
            for market in ctx.markets() {
                if out.len() >= self.config.max_proposals {
                    break;
                }
                if market.price < self.config.min_longshot_price
                    || market.price > self.config.max_longshot_price
                {
                    continue;
                }
                if ctx.held_quantity(&market.market_id) > Decimal::ZERO {
                    continue;
                }
                // Cheaper longshots pay more but hit less; keep conviction flat
                // and low so these never outrank conviction trades
                let edge = (self.config.max_longshot_price - market.price)
                    / self.config.max_longshot_price;
                let confidence = (dec!(0.55) + edge * dec!(0.10)).round_dp(4);
                let limit = market.best_ask.unwrap_or(market.price).min(dec!(0.99));

                out.push(
                    Proposal::buy(self.id(), market.market_id.clone(), cash, limit, confidence)
                        .with_question(market.question.clone())
                        .with_rationale(format!(
                            "longshot at mid {} with ${} lifetime volume",
                            market.price, market.volume_usd
                        )),
                );
            }
        }

        Ok(out)
    }
}
