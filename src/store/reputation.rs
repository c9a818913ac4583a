use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ReputationConfig;

/// Per-strategy performance history and the adaptive weight derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub strategy_id: String,
    pub rounds_participated: u64,
    pub proposals_made: u64,
    pub proposals_executed: u64,
    pub proposals_rejected: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub realized_pnl_attributed: Decimal,
    /// Multiplier applied to ranking and sizing, clamped to the configured bounds
    pub current_weight: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl ReputationRecord {
    pub(crate) fn new(strategy_id: impl Into<String>, weight: Decimal) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            rounds_participated: 0,
            proposals_made: 0,
            proposals_executed: 0,
            proposals_rejected: 0,
            winning_trades: 0,
            losing_trades: 0,
            realized_pnl_attributed: Decimal::ZERO,
            current_weight: weight,
            updated_at: Utc::now(),
        }
    }

    /// Share of closed trades that realized a profit
    pub fn win_rate(&self) -> Option<Decimal> {
        let closed = self.winning_trades + self.losing_trades;
        if closed == 0 {
            return None;
        }
        Some(Decimal::from(self.winning_trades) / Decimal::from(closed))
    }
}

/// What one strategy did in one settled round
#[derive(Debug, Clone, Default)]
pub struct RoundPerf {
    pub proposals: u64,
    pub executed: u64,
    /// Conflicts, insufficient funds, vetoes and gateway failures
    pub rejected: u64,
    pub realized_pnl: Decimal,
    pub winning_trades: u64,
    pub losing_trades: u64,
}

/// The coordinator-owned book of reputation records
#[derive(Debug, Clone)]
pub(crate) struct ReputationBook {
    records: HashMap<String, ReputationRecord>,
    config: ReputationConfig,
}

impl ReputationBook {
    pub fn new(config: ReputationConfig) -> Self {
        Self {
            records: HashMap::new(),
            config,
        }
    }

    /// Current weight; unseen strategies get the configured initial weight
    pub fn weight_of(&self, strategy_id: &str) -> Decimal {
        self.records
            .get(strategy_id)
            .map(|r| r.current_weight)
            .unwrap_or(self.config.initial_weight)
    }

    pub fn record(&self, strategy_id: &str) -> ReputationRecord {
        self.records
            .get(strategy_id)
            .cloned()
            .unwrap_or_else(|| ReputationRecord::new(strategy_id, self.config.initial_weight))
    }

    /// All records, ordered by strategy id
    pub fn all(&self) -> Vec<ReputationRecord> {
        let mut out: Vec<ReputationRecord> = self.records.values().cloned().collect();
        out.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));
        out
    }

    /// Settle one round for one participating strategy.
    ///
    /// Weight moves with realized P&L, with an extra penalty when at least
    /// half of the strategy's proposals were turned away. Timed-out units
    /// never reach this method, so their records stay untouched.
    pub fn apply_round(&mut self, strategy_id: &str, perf: &RoundPerf) -> (Decimal, Decimal) {
        let initial = self.config.initial_weight;
        let record = self
            .records
            .entry(strategy_id.to_string())
            .or_insert_with(|| ReputationRecord::new(strategy_id, initial));

        let before = record.current_weight;
        let mut weight = before;

        if perf.realized_pnl > Decimal::ZERO {
            weight += self.config.gain_step;
        } else if perf.realized_pnl < Decimal::ZERO {
            weight -= self.config.loss_step;
        }
        if perf.rejected > 0 && perf.rejected * 2 >= perf.proposals {
            weight -= self.config.rejection_step;
        }
        weight = weight
            .max(self.config.min_weight)
            .min(self.config.max_weight);

        record.rounds_participated += 1;
        record.proposals_made += perf.proposals;
        record.proposals_executed += perf.executed;
        record.proposals_rejected += perf.rejected;
        record.winning_trades += perf.winning_trades;
        record.losing_trades += perf.losing_trades;
        record.realized_pnl_attributed += perf.realized_pnl;
        record.current_weight = weight;
        record.updated_at = Utc::now();

        (before, weight)
    }
}
