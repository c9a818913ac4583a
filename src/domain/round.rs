use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::market::Side;
use super::proposal::{Proposal, ProposalStatus};

/// Point-in-time view of the shared treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryView {
    pub available_cash: Decimal,
    pub reserved_cash: Decimal,
    /// Cost basis of all open positions
    pub total_deployed: Decimal,
}

impl TreasuryView {
    /// Total equity at cost basis
    pub fn equity(&self) -> Decimal {
        self.available_cash + self.reserved_cash + self.total_deployed
    }
}

/// Fill confirmation returned by the execution gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub filled: bool,
    pub fill_price: Decimal,
    /// Shares moved
    pub fill_quantity: Decimal,
    /// Venue order id, when one was assigned
    pub order_id: Option<String>,
}

impl Fill {
    pub fn filled(price: Decimal, quantity: Decimal) -> Self {
        Self {
            filled: true,
            fill_price: price,
            fill_quantity: quantity,
            order_id: None,
        }
    }

    pub fn unfilled() -> Self {
        Self {
            filled: false,
            fill_price: Decimal::ZERO,
            fill_quantity: Decimal::ZERO,
            order_id: None,
        }
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// True when the venue actually crossed something: marked filled with
    /// positive price and quantity. Anything else settles as no fill.
    pub fn is_settleable(&self) -> bool {
        self.filled && self.fill_quantity > Decimal::ZERO && self.fill_price > Decimal::ZERO
    }
}

/// One settled fill as recorded in the round log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub proposal_id: Uuid,
    pub strategy_id: String,
    pub market_id: String,
    pub side: Side,
    pub fill_price: Decimal,
    pub fill_quantity: Decimal,
    /// Cash that left (BUY) or entered (SELL) the treasury
    pub cash_delta: Decimal,
    /// Realized P&L; zero for buys
    pub realized_pnl: Decimal,
    pub order_id: Option<String>,
    pub filled_at: DateTime<Utc>,
}

/// A proposal with its ranking and final outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub proposal: Proposal,
    /// Position in the ranked queue (1 = first); None if invalid pre-rank
    pub rank: Option<u32>,
    /// confidence x weight at ranking time
    pub score: Decimal,
    pub status: ProposalStatus,
}

/// Operating mode of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundMode {
    Live,
    ReadOnly,
    Paper,
}

impl RoundMode {
    pub fn submits_orders(&self) -> bool {
        !matches!(self, RoundMode::ReadOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundMode::Live => "live",
            RoundMode::ReadOnly => "read_only",
            RoundMode::Paper => "paper",
        }
    }
}

impl std::fmt::Display for RoundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which snapshot a round was decided against
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub fetched_at: DateTime<Utc>,
    pub market_count: usize,
}

/// One immutable entry in the store's mutation audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub round_id: u64,
    pub at: DateTime<Utc>,
    pub op: AuditOp,
}

/// The mutation an audit entry records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOp {
    RoundOpened {
        treasury: TreasuryView,
    },
    Reserved {
        reservation_id: Uuid,
        strategy_id: String,
        market_id: String,
        side: Side,
        cash: Decimal,
        shares: Decimal,
    },
    ReservationShrunk {
        reservation_id: Uuid,
        from: Decimal,
        to: Decimal,
    },
    Released {
        reservation_id: Uuid,
        cash: Decimal,
    },
    FillApplied {
        reservation_id: Uuid,
        market_id: String,
        side: Side,
        fill_price: Decimal,
        fill_quantity: Decimal,
        cash_delta: Decimal,
        realized_pnl: Decimal,
    },
    ReputationUpdated {
        strategy_id: String,
        weight_before: Decimal,
        weight_after: Decimal,
    },
    RoundClosed {
        treasury: TreasuryView,
    },
}

/// Append-only log entry for one completed round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: u64,
    pub started_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub mode: RoundMode,
    pub snapshot: SnapshotRef,
    pub proposals: Vec<ProposalRecord>,
    pub executed: Vec<FillRecord>,
    pub treasury_before: TreasuryView,
    pub treasury_after: TreasuryView,
    /// Realized P&L attributed to each strategy this round
    pub pnl_by_strategy: BTreeMap<String, Decimal>,
    pub audit: Vec<AuditEntry>,
}

impl RoundRecord {
    /// Realized P&L across all strategies this round
    pub fn round_pnl(&self) -> Decimal {
        self.pnl_by_strategy.values().copied().sum()
    }

    pub fn admitted_count(&self) -> usize {
        self.proposals
            .iter()
            .filter(|p| {
                matches!(
                    p.status,
                    ProposalStatus::Admitted
                        | ProposalStatus::Executed
                        | ProposalStatus::Vetoed
                        | ProposalStatus::Failed(_)
                        | ProposalStatus::SkippedReadOnly
                )
            })
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.proposals
            .iter()
            .filter(|p| matches!(p.status, ProposalStatus::Rejected(_)))
            .count()
    }
}
