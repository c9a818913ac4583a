//! Contrarian unit: fades crowded prices.
//!
//! Buys outcomes the crowd has written off and takes profit on held
//! positions once the crowd piles in. Runs every round; its edge is
//! patience, not timing.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::Proposal;
use crate::error::Result;

use super::{sized_cash, ProposalContext, Strategy};

#[derive(Debug, Clone)]
pub struct ContrarianConfig {
    /// Mids below this are ignored as dead markets
    pub min_buy_price: Decimal,
    /// Highest mid the unit will fade into
    pub max_buy_price: Decimal,
    /// Held positions at or above this mid get sold
    pub sell_trigger_price: Decimal,
    pub bet_pct: Decimal,
    pub max_proposals: usize,
}

impl Default for ContrarianConfig {
    fn default() -> Self {
        Self {
            min_buy_price: dec!(0.03),
            max_buy_price: dec!(0.30),
            sell_trigger_price: dec!(0.70),
            bet_pct: dec!(0.04),
            max_proposals: 2,
        }
    }
}

pub struct ContrarianStrategy {
    config: ContrarianConfig,
}

impl ContrarianStrategy {
    pub fn new() -> Self {
        Self::with_config(ContrarianConfig::default())
    }

    pub fn with_config(config: ContrarianConfig) -> Self {
        Self { config }
    }
}

impl Default for ContrarianStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for ContrarianStrategy {
    fn id(&self) -> &str {
        "contrarian"
    }

    fn name(&self) -> &str {
        "Contrarian"
    }

    async fn propose(&self, ctx: &ProposalContext) -> Result<Vec<Proposal>> {
        let mut out = Vec::new();

        // Take profit first: held positions the crowd chased up
        for market in ctx.markets() {
            if out.len() >= self.config.max_proposals {
                break;
            }
            let held = ctx.held_quantity(&market.market_id);
            if held <= Decimal::ZERO || market.price < self.config.sell_trigger_price {
                continue;
            }
            let run = (market.price - self.config.sell_trigger_price)
                / (Decimal::ONE - self.config.sell_trigger_price);
            let confidence = (dec!(0.60) + run * dec!(0.30)).round_dp(4);
            // Hit the bid; resting sells on a run-up go unfilled
            let limit = market.best_bid.unwrap_or(market.price).max(dec!(0.01));

            out.push(
                Proposal::sell(self.id(), market.market_id.clone(), held, limit, confidence)
                    .with_question(market.question.clone())
                    .with_rationale(format!(
                        "taking profit: mid {} at or above trigger {}",
                        market.price, self.config.sell_trigger_price
                    )),
            );
        }

        // Then fade pessimism on markets nobody wants
        let cash = sized_cash(ctx, self.config.bet_pct);
        if cash > Decimal::ZERO {
            for market in ctx.markets() {
                if out.len() >= self.config.max_proposals {
                    break;
                }
                if market.price < self.config.min_buy_price
                    || market.price > self.config.max_buy_price
                {
                    continue;
                }
                if ctx.held_quantity(&market.market_id) > Decimal::ZERO {
                    continue;
                }
                let depth = (self.config.max_buy_price - market.price) / self.config.max_buy_price;
                let confidence = (dec!(0.55) + depth * dec!(0.25)).round_dp(4);
                let limit = market.best_ask.unwrap_or(market.price).min(dec!(0.99));

                out.push(
                    Proposal::buy(self.id(), market.market_id.clone(), cash, limit, confidence)
                        .with_question(market.question.clone())
                        .with_rationale(format!(
                            "fading pessimism: mid {} under {}",
                            market.price, self.config.max_buy_price
                        )),
                );
            }
        }

        Ok(out)
    }
}
