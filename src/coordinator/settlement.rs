//! Per-strategy settlement aggregation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::{FillRecord, ProposalRecord, ProposalStatus, RejectReason};
use crate::store::RoundPerf;

/// Aggregate what each participating unit did this round.
///
/// Only units that answered before the deadline appear; timed-out units
/// are absent so their reputation stays untouched. A unit that answered
/// with zero proposals still participates.
pub fn aggregate_perf(
    participants: &[String],
    records: &[ProposalRecord],
    fills: &[FillRecord],
) -> BTreeMap<String, RoundPerf> {
    let mut perf: BTreeMap<String, RoundPerf> = participants
        .iter()
        .map(|id| (id.clone(), RoundPerf::default()))
        .collect();

    for record in records {
        let Some(entry) = perf.get_mut(&record.proposal.strategy_id) else {
            continue;
        };
        entry.proposals += 1;
        // Only proposals the round turned away after ranking count toward
        // the rejection penalty; validation failures never entered ranking.
        match &record.status {
            ProposalStatus::Executed => entry.executed += 1,
            ProposalStatus::Rejected(RejectReason::Invalid(_)) => {}
            status if status.is_rejected() => entry.rejected += 1,
            _ => {}
        }
    }

    for fill in fills {
        let Some(entry) = perf.get_mut(&fill.strategy_id) else {
            continue;
        };
        entry.realized_pnl += fill.realized_pnl;
        if fill.realized_pnl > Decimal::ZERO {
            entry.winning_trades += 1;
        } else if fill.realized_pnl < Decimal::ZERO {
            entry.losing_trades += 1;
        }
    }

    perf
}
