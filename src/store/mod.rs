//! Shared state store: treasury, positions, reputation, audit trail.
//!
//! The store is the single owner of all mutable swarm state. Every mutation
//! is all-or-nothing behind one lock and appends one audit entry; readers
//! get cloned snapshots and never observe a half-applied operation. The
//! lock is never held across an await on an external call.

mod position;
mod reputation;
mod treasury;

pub use position::Position;
pub use reputation::{ReputationRecord, RoundPerf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::ReputationConfig;
use crate::domain::{AuditEntry, AuditOp, Fill, PositionKey, Proposal, Side, TreasuryView};
use crate::error::StoreError;
use position::PositionBook;
use reputation::ReputationBook;
use treasury::Treasury;

/// A live hold taken at admission: cash for buys, shares for sells.
///
/// The `(market_id, side)` claim it carries stays taken for the whole round
/// even if the reservation is released early.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub round_id: u64,
    pub proposal_id: Uuid,
    pub strategy_id: String,
    pub market_id: String,
    pub side: Side,
    /// Cash held for buys; zero for sells
    pub cash: Decimal,
    /// Shares earmarked for sells; zero for buys
    pub shares: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    fn position_key(&self) -> PositionKey {
        PositionKey::new(self.market_id.clone(), Side::Buy)
    }
}

/// Treasury/position delta produced by settling one fill
#[derive(Debug, Clone, Copy)]
pub struct FillOutcome {
    /// Negative when cash left the treasury (buys), positive for proceeds
    pub cash_delta: Decimal,
    /// Zero for buys; proceeds minus removed cost basis for sells
    pub realized_pnl: Decimal,
}

#[derive(Debug)]
struct StoreInner {
    treasury: Treasury,
    positions: PositionBook,
    reputation: ReputationBook,
    reservations: HashMap<Uuid, Reservation>,
    round_claims: HashSet<PositionKey>,
    current_round: u64,
    audit: Vec<AuditEntry>,
    audit_seq: u64,
}

impl StoreInner {
    fn push_audit(&mut self, op: AuditOp) {
        self.audit_seq += 1;
        self.audit.push(AuditEntry {
            seq: self.audit_seq,
            round_id: self.current_round,
            at: Utc::now(),
            op,
        });
    }

    /// Cash conservation and bookkeeping cross-checks; a failure here means
    /// the store can no longer be trusted and the run must halt.
    fn check_conservation(&self) -> std::result::Result<(), StoreError> {
        if self.treasury.available() < Decimal::ZERO {
            return Err(StoreError::Corruption(format!(
                "available cash is negative: {}",
                self.treasury.available()
            )));
        }
        let held: Decimal = self.reservations.values().map(|r| r.cash).sum();
        if held != self.treasury.reserved() {
            return Err(StoreError::Corruption(format!(
                "reserved cash {} does not match live reservations {held}",
                self.treasury.reserved()
            )));
        }
        let basis = self.positions.total_cost_basis();
        if basis != self.treasury.deployed() {
            return Err(StoreError::Corruption(format!(
                "deployed cash {} does not match position cost basis {basis}",
                self.treasury.deployed()
            )));
        }
        Ok(())
    }
}

/// The single source of truth shared by the coordinator and all strategies
#[derive(Debug)]
pub struct StateStore {
    inner: RwLock<StoreInner>,
}

impl StateStore {
    pub fn new(initial_cash: Decimal, reputation: ReputationConfig) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                treasury: Treasury::new(initial_cash),
                positions: PositionBook::default(),
                reputation: ReputationBook::new(reputation),
                reservations: HashMap::new(),
                round_claims: HashSet::new(),
                current_round: 0,
                audit: Vec::new(),
                audit_seq: 0,
            }),
        }
    }

    // --- atomic reads ---

    pub async fn treasury(&self) -> TreasuryView {
        self.inner.read().await.treasury.view()
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.inner.read().await.positions.all()
    }

    pub async fn position(&self, key: &PositionKey) -> Option<Position> {
        self.inner.read().await.positions.get(key).cloned()
    }

    /// Long-book quantity held for a market
    pub async fn held_quantity(&self, market_id: &str) -> Decimal {
        let key = PositionKey::new(market_id, Side::Buy);
        self.inner.read().await.positions.quantity(&key)
    }

    pub async fn reputation(&self, strategy_id: &str) -> ReputationRecord {
        self.inner.read().await.reputation.record(strategy_id)
    }

    pub async fn weight_of(&self, strategy_id: &str) -> Decimal {
        self.inner.read().await.reputation.weight_of(strategy_id)
    }

    pub async fn all_reputation(&self) -> Vec<ReputationRecord> {
        self.inner.read().await.reputation.all()
    }

    // --- round lifecycle ---

    /// Open a round: forget the previous round's claims and stamp the
    /// opening treasury into the audit trail.
    pub async fn begin_round(&self, round_id: u64) -> TreasuryView {
        let mut inner = self.inner.write().await;
        inner.current_round = round_id;
        inner.round_claims.clear();
        let view = inner.treasury.view();
        inner.push_audit(AuditOp::RoundOpened { treasury: view });
        view
    }

    /// Admission control for one proposal.
    ///
    /// Claim collision is checked before affordability, so a duplicate
    /// `(market, side)` is a `Conflict` regardless of treasury state.
    pub async fn reserve(
        &self,
        round_id: u64,
        proposal: &Proposal,
    ) -> std::result::Result<Uuid, StoreError> {
        let mut inner = self.inner.write().await;
        if round_id != inner.current_round {
            return Err(StoreError::Corruption(format!(
                "reserve for round {round_id} while round {} is open",
                inner.current_round
            )));
        }
        if proposal.requested_amount <= Decimal::ZERO {
            return Err(StoreError::Corruption(format!(
                "non-positive reservation amount {}",
                proposal.requested_amount
            )));
        }

        let claim = proposal.claim_key();
        if inner.round_claims.contains(&claim) {
            return Err(StoreError::Conflict {
                market_id: proposal.market_id.clone(),
                side: proposal.side.to_string(),
            });
        }

        let (cash, shares) = match proposal.side {
            Side::Buy => {
                inner.treasury.reserve(proposal.requested_amount)?;
                (proposal.requested_amount, Decimal::ZERO)
            }
            Side::Sell => {
                let held = inner.positions.quantity(&proposal.position_key());
                if proposal.requested_amount > held {
                    return Err(StoreError::InsufficientPosition {
                        requested: proposal.requested_amount,
                        held,
                    });
                }
                (Decimal::ZERO, proposal.requested_amount)
            }
        };

        let reservation_id = Uuid::new_v4();
        inner.round_claims.insert(claim);
        inner.reservations.insert(
            reservation_id,
            Reservation {
                reservation_id,
                round_id,
                proposal_id: proposal.proposal_id,
                strategy_id: proposal.strategy_id.clone(),
                market_id: proposal.market_id.clone(),
                side: proposal.side,
                cash,
                shares,
                created_at: Utc::now(),
            },
        );
        inner.push_audit(AuditOp::Reserved {
            reservation_id,
            strategy_id: proposal.strategy_id.clone(),
            market_id: proposal.market_id.clone(),
            side: proposal.side,
            cash,
            shares,
        });
        Ok(reservation_id)
    }

    /// Scale a reservation down after an advisory verdict; growing is refused
    pub async fn shrink_reservation(
        &self,
        reservation_id: Uuid,
        new_amount: Decimal,
    ) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let (side, cash, shares) = match inner.reservations.get(&reservation_id) {
            Some(r) => (r.side, r.cash, r.shares),
            None => return Err(StoreError::UnknownReservation { reservation_id }),
        };

        match side {
            Side::Buy => {
                if new_amount > cash {
                    return Err(StoreError::ReservationGrow {
                        from: cash,
                        to: new_amount,
                    });
                }
                inner.treasury.release(cash - new_amount)?;
                if let Some(r) = inner.reservations.get_mut(&reservation_id) {
                    r.cash = new_amount;
                }
                inner.push_audit(AuditOp::ReservationShrunk {
                    reservation_id,
                    from: cash,
                    to: new_amount,
                });
            }
            Side::Sell => {
                if new_amount > shares {
                    return Err(StoreError::ReservationGrow {
                        from: shares,
                        to: new_amount,
                    });
                }
                if let Some(r) = inner.reservations.get_mut(&reservation_id) {
                    r.shares = new_amount;
                }
                inner.push_audit(AuditOp::ReservationShrunk {
                    reservation_id,
                    from: shares,
                    to: new_amount,
                });
            }
        }
        Ok(())
    }

    /// Drop a reservation and return its cash to the pool.
    ///
    /// The round claim stays taken; freed cash becomes reservable again
    /// only at the next round's admission pass.
    pub async fn release(
        &self,
        reservation_id: Uuid,
    ) -> std::result::Result<Decimal, StoreError> {
        let mut inner = self.inner.write().await;
        let reservation = inner
            .reservations
            .remove(&reservation_id)
            .ok_or(StoreError::UnknownReservation { reservation_id })?;
        if reservation.cash > Decimal::ZERO {
            inner.treasury.release(reservation.cash)?;
        }
        inner.push_audit(AuditOp::Released {
            reservation_id,
            cash: reservation.cash,
        });
        Ok(reservation.cash)
    }

    /// Settle a confirmed fill into treasury and positions.
    ///
    /// Unfilled orders must go through `release` instead. Every check runs
    /// before any mutation: a fill that cannot settle leaves the
    /// reservation, its cash, and the books exactly as they were.
    pub async fn apply_fill(
        &self,
        reservation_id: Uuid,
        fill: &Fill,
    ) -> std::result::Result<FillOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let reservation = inner
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or(StoreError::UnknownReservation { reservation_id })?;
        if !fill.is_settleable() {
            return Err(StoreError::Corruption(format!(
                "unfilled or empty fill applied to reservation {reservation_id}"
            )));
        }

        let outcome = match reservation.side {
            Side::Buy => {
                let cost = fill.fill_price * fill.fill_quantity;
                if cost > reservation.cash {
                    return Err(StoreError::Corruption(format!(
                        "buy fill cost {cost} exceeds reserved cash {}",
                        reservation.cash
                    )));
                }
                inner.treasury.settle_buy(reservation.cash, cost)?;
                inner.positions.apply_buy(
                    reservation.position_key(),
                    fill.fill_quantity,
                    fill.fill_price,
                    Utc::now(),
                );
                FillOutcome {
                    cash_delta: -cost,
                    realized_pnl: Decimal::ZERO,
                }
            }
            Side::Sell => {
                if fill.fill_quantity > reservation.shares {
                    return Err(StoreError::Corruption(format!(
                        "sell fill of {} exceeds reserved shares {}",
                        fill.fill_quantity, reservation.shares
                    )));
                }
                let proceeds = fill.fill_price * fill.fill_quantity;
                let cost_basis = inner
                    .positions
                    .apply_sell(&reservation.position_key(), fill.fill_quantity)?;
                inner.treasury.settle_sell(proceeds, cost_basis)?;
                FillOutcome {
                    cash_delta: proceeds,
                    realized_pnl: proceeds - cost_basis,
                }
            }
        };

        inner.reservations.remove(&reservation_id);
        inner.push_audit(AuditOp::FillApplied {
            reservation_id,
            market_id: reservation.market_id.clone(),
            side: reservation.side,
            fill_price: fill.fill_price,
            fill_quantity: fill.fill_quantity,
            cash_delta: outcome.cash_delta,
            realized_pnl: outcome.realized_pnl,
        });
        Ok(outcome)
    }

    /// Settle one strategy's round into its reputation record; returns the
    /// weight before and after
    pub async fn update_reputation(
        &self,
        strategy_id: &str,
        perf: &RoundPerf,
    ) -> (Decimal, Decimal) {
        let mut inner = self.inner.write().await;
        let (before, after) = inner.reputation.apply_round(strategy_id, perf);
        inner.push_audit(AuditOp::ReputationUpdated {
            strategy_id: strategy_id.to_string(),
            weight_before: before,
            weight_after: after,
        });
        (before, after)
    }

    /// Close the round: every reservation must be settled or released, and
    /// the books must balance. Returns the closing treasury and the round's
    /// drained audit entries.
    pub async fn close_round(
        &self,
        round_id: u64,
    ) -> std::result::Result<(TreasuryView, Vec<AuditEntry>), StoreError> {
        let mut inner = self.inner.write().await;
        if round_id != inner.current_round {
            return Err(StoreError::Corruption(format!(
                "close of round {round_id} while round {} is open",
                inner.current_round
            )));
        }
        if !inner.reservations.is_empty() {
            return Err(StoreError::Corruption(format!(
                "{} reservation(s) still outstanding at round close",
                inner.reservations.len()
            )));
        }
        inner.check_conservation()?;

        let view = inner.treasury.view();
        inner.push_audit(AuditOp::RoundClosed { treasury: view });
        let audit = std::mem::take(&mut inner.audit);
        Ok((view, audit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store(initial: Decimal) -> StateStore {
        StateStore::new(initial, ReputationConfig::default())
    }

    fn buy(strategy: &str, market: &str, cash: Decimal) -> Proposal {
        Proposal::buy(strategy, market, cash, dec!(0.50), dec!(0.9))
    }

    #[tokio::test]
    async fn test_same_key_is_conflict_before_funds() {
        let store = store(dec!(100));
        store.begin_round(1).await;

        let first = buy("alpha", "m1", dec!(60));
        store.reserve(1, &first).await.unwrap();

        // Second claim on (m1, BUY) collides even though 70 > 40 remaining
        let second = buy("beta", "m1", dec!(70));
        let err = store.reserve(1, &second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let view = store.treasury().await;
        assert_eq!(view.available_cash, dec!(40));
        assert_eq!(view.reserved_cash, dec!(60));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_treasury_unchanged() {
        let store = store(dec!(50));
        store.begin_round(1).await;

        let err = store.reserve(1, &buy("alpha", "m1", dec!(80))).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds { .. }));

        let view = store.treasury().await;
        assert_eq!(view.available_cash, dec!(50));
        assert_eq!(view.reserved_cash, Decimal::ZERO);

        // Over-100% requests are never partially admitted
        let err = store.reserve(1, &buy("alpha", "m2", dec!(100.01))).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn test_released_claim_persists_for_the_round() {
        let store = store(dec!(100));
        store.begin_round(1).await;

        let id = store.reserve(1, &buy("alpha", "m1", dec!(60))).await.unwrap();
        let freed = store.release(id).await.unwrap();
        assert_eq!(freed, dec!(60));
        assert_eq!(store.treasury().await.available_cash, dec!(100));

        // Same key this round: still a conflict despite the release
        let err = store.reserve(1, &buy("beta", "m1", dec!(20))).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        // Next round the claim is gone and the cash is usable
        store.close_round(1).await.unwrap();
        store.begin_round(2).await;
        assert!(store.reserve(2, &buy("beta", "m1", dec!(20))).await.is_ok());
    }

    #[tokio::test]
    async fn test_buy_fill_conserves_equity_and_refunds_remainder() {
        let store = store(dec!(100));
        store.begin_round(1).await;

        let id = store.reserve(1, &buy("alpha", "m1", dec!(60))).await.unwrap();
        // Filled cheaper than target: 120 shares at 0.40 = 48, refund 12
        let outcome = store
            .apply_fill(id, &Fill::filled(dec!(0.40), dec!(120)))
            .await
            .unwrap();
        assert_eq!(outcome.cash_delta, dec!(-48));
        assert_eq!(outcome.realized_pnl, Decimal::ZERO);

        let view = store.treasury().await;
        assert_eq!(view.available_cash, dec!(52));
        assert_eq!(view.reserved_cash, Decimal::ZERO);
        assert_eq!(view.total_deployed, dec!(48));
        assert_eq!(view.equity(), dec!(100));

        assert_eq!(store.held_quantity("m1").await, dec!(120));
        let (after, audit) = store.close_round(1).await.unwrap();
        assert_eq!(after.equity(), dec!(100));
        assert_eq!(audit.len(), 4); // opened, reserved, fill, closed
    }

    #[tokio::test]
    async fn test_sell_flow_realizes_pnl() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(60))).await.unwrap();
        store
            .apply_fill(id, &Fill::filled(dec!(0.50), dec!(120)))
            .await
            .unwrap();
        store.close_round(1).await.unwrap();

        store.begin_round(2).await;
        let sell = Proposal::sell("alpha", "m1", dec!(50), dec!(0.60), dec!(0.8));
        let id = store.reserve(2, &sell).await.unwrap();
        let outcome = store
            .apply_fill(id, &Fill::filled(dec!(0.60), dec!(50)))
            .await
            .unwrap();

        // Proceeds 30 against 25 of cost basis
        assert_eq!(outcome.cash_delta, dec!(30));
        assert_eq!(outcome.realized_pnl, dec!(5.0));

        let view = store.treasury().await;
        assert_eq!(view.available_cash, dec!(70));
        assert_eq!(view.total_deployed, dec!(35.0));
        assert_eq!(store.held_quantity("m1").await, dec!(70));
        store.close_round(2).await.unwrap();
    }

    #[tokio::test]
    async fn test_sell_exceeding_holding_rejected_at_admission() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(30))).await.unwrap();
        store
            .apply_fill(id, &Fill::filled(dec!(0.50), dec!(60)))
            .await
            .unwrap();
        store.close_round(1).await.unwrap();

        store.begin_round(2).await;
        let sell = Proposal::sell("alpha", "m1", dec!(100), dec!(0.60), dec!(0.8));
        let err = store.reserve(2, &sell).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientPosition { held, .. } if held == dec!(60)
        ));
    }

    #[tokio::test]
    async fn test_unsettleable_fill_leaves_reservation_intact() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(60))).await.unwrap();

        // Zero-quantity fill: refused before anything moves
        let err = store
            .apply_fill(id, &Fill::filled(dec!(0.50), Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));

        // Fill costing more than the hold: same refusal
        let err = store
            .apply_fill(id, &Fill::filled(dec!(0.70), dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));

        let view = store.treasury().await;
        assert_eq!(view.available_cash, dec!(40));
        assert_eq!(view.reserved_cash, dec!(60));

        // The hold is still live: releasable, and the round closes balanced
        assert_eq!(store.release(id).await.unwrap(), dec!(60));
        let (after, _) = store.close_round(1).await.unwrap();
        assert_eq!(after.equity(), dec!(100));
    }

    #[tokio::test]
    async fn test_oversized_sell_fill_rejected_without_side_effects() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(30))).await.unwrap();
        store
            .apply_fill(id, &Fill::filled(dec!(0.50), dec!(60)))
            .await
            .unwrap();
        store.close_round(1).await.unwrap();

        store.begin_round(2).await;
        let sell = Proposal::sell("alpha", "m1", dec!(40), dec!(0.60), dec!(0.8));
        let id = store.reserve(2, &sell).await.unwrap();

        // Venue reports more shares crossed than were reserved
        let err = store
            .apply_fill(id, &Fill::filled(dec!(0.60), dec!(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));
        assert_eq!(store.held_quantity("m1").await, dec!(60));

        // The reservation survives and the round still closes balanced
        store.release(id).await.unwrap();
        let (after, _) = store.close_round(2).await.unwrap();
        assert_eq!(after.equity(), dec!(100));
    }

    #[tokio::test]
    async fn test_shrink_reservation_releases_difference() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(60))).await.unwrap();

        store.shrink_reservation(id, dec!(40)).await.unwrap();
        let view = store.treasury().await;
        assert_eq!(view.available_cash, dec!(60));
        assert_eq!(view.reserved_cash, dec!(40));

        let err = store.shrink_reservation(id, dec!(70)).await.unwrap_err();
        assert!(matches!(err, StoreError::ReservationGrow { .. }));

        // Settle at the shrunk size
        store
            .apply_fill(id, &Fill::filled(dec!(0.50), dec!(80)))
            .await
            .unwrap();
        store.close_round(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_round_flags_dangling_reservation() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(60))).await.unwrap();

        let err = store.close_round(1).await.unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));

        store.release(id).await.unwrap();
        assert!(store.close_round(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_reserve_outside_open_round_is_corruption() {
        let store = store(dec!(100));
        store.begin_round(3).await;
        let err = store.reserve(7, &buy("alpha", "m1", dec!(10))).await.unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));
    }

    #[tokio::test]
    async fn test_audit_trail_ordered_and_drained() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let id = store.reserve(1, &buy("alpha", "m1", dec!(20))).await.unwrap();
        store.release(id).await.unwrap();
        store
            .update_reputation(
                "alpha",
                &RoundPerf {
                    proposals: 1,
                    rejected: 1,
                    ..Default::default()
                },
            )
            .await;
        let (_, audit) = store.close_round(1).await.unwrap();

        let seqs: Vec<u64> = audit.iter().map(|e| e.seq).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
        assert!(matches!(audit.first().map(|e| &e.op), Some(AuditOp::RoundOpened { .. })));
        assert!(matches!(audit.last().map(|e| &e.op), Some(AuditOp::RoundClosed { .. })));

        // Next round starts with an empty buffer
        store.begin_round(2).await;
        let (_, audit) = store.close_round(2).await.unwrap();
        assert_eq!(audit.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_activity_round_conserves_cash() {
        let store = store(dec!(77));
        let before = store.begin_round(1).await;
        let (after, _) = store.close_round(1).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(after.equity(), dec!(77));
    }

    #[tokio::test]
    async fn test_reputation_update_audited() {
        let store = store(dec!(100));
        store.begin_round(1).await;
        let perf = RoundPerf {
            proposals: 1,
            executed: 1,
            realized_pnl: dec!(3),
            winning_trades: 1,
            ..Default::default()
        };
        let (before, after) = store.update_reputation("alpha", &perf).await;
        assert_eq!(before, dec!(1));
        assert_eq!(after, dec!(1.05));
        assert_eq!(store.weight_of("alpha").await, dec!(1.05));

        let (_, audit) = store.close_round(1).await.unwrap();
        assert!(audit
            .iter()
            .any(|e| matches!(&e.op, AuditOp::ReputationUpdated { strategy_id, .. } if strategy_id == "alpha")));
    }
}
