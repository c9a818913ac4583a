//! Round coordinator: the sequential heart of the swarm.
//!
//! Strategy units run concurrently against a frozen snapshot, but everything
//! that touches shared state happens here, one proposal at a time, in rank
//! order. The coordinator owns the round lifecycle end to end: snapshot,
//! proposal collection, ranking, admission, advisory review, submission,
//! settlement, and reputation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::advisory::{Advisor, FailPolicy, Verdict};
use crate::config::AppConfig;
use crate::domain::{
    FillRecord, MarketSnapshot, Proposal, ProposalRecord, ProposalStatus, RejectReason, RoundMode,
    RoundRecord, Side, SnapshotRef,
};
use crate::error::{GambitError, GatewayError, Result, StoreError};
use crate::gateway::ExecutionGateway;
use crate::provider::SnapshotProvider;
use crate::store::StateStore;
use crate::strategy::{ProposalContext, Strategy};

use super::ranking::{rank_proposals, RankedProposal};
use super::settlement::aggregate_perf;

/// Drives trading rounds until shutdown, the round budget, or state
/// corruption stops it. Rounds never overlap: the next tick waits for the
/// previous round to finish.
pub struct RoundCoordinator {
    config: AppConfig,
    store: Arc<StateStore>,
    provider: Arc<dyn SnapshotProvider>,
    strategies: Vec<Arc<dyn Strategy>>,
    advisor: Option<Arc<dyn Advisor>>,
    gateway: Arc<dyn ExecutionGateway>,
    /// Set when the gateway reports missing credentials mid-flight. Later
    /// rounds then open read-only instead of retrying doomed submissions.
    degraded_read_only: bool,
    round_seq: u64,
    rounds: Vec<RoundRecord>,
}

impl RoundCoordinator {
    pub fn new(
        config: AppConfig,
        store: Arc<StateStore>,
        provider: Arc<dyn SnapshotProvider>,
        strategies: Vec<Arc<dyn Strategy>>,
        advisor: Option<Arc<dyn Advisor>>,
        gateway: Arc<dyn ExecutionGateway>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            strategies,
            advisor,
            gateway,
            degraded_read_only: false,
            round_seq: 0,
            rounds: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Main loop. Ticks on the configured interval, runs one round per tick,
    /// and returns the accumulated round records on clean shutdown.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<Vec<RoundRecord>> {
        info!(
            strategies = self.strategies.len(),
            interval_secs = self.config.round.interval_secs,
            advisory = self.advisor.is_some(),
            mode = %self.effective_mode(),
            "coordinator starting main loop"
        );

        let mut tick = tokio::time::interval(Duration::from_secs(self.config.round.interval_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match self.execute_round().await {
                        Ok(record) => {
                            info!(
                                round_id = record.round_id,
                                executed = record.executed.len(),
                                rejected = record.rejected_count(),
                                round_pnl = %record.round_pnl(),
                                cash = %record.treasury_after.available_cash,
                                "round closed"
                            );
                            self.rounds.push(record);
                            let budget = self.config.round.max_rounds;
                            if budget > 0 && self.rounds.len() as u64 >= budget {
                                info!(rounds = self.rounds.len(), "round budget reached");
                                break;
                            }
                        }
                        Err(err @ GambitError::StateCorruption(_)) => {
                            error!(error = %err, "treasury invariants violated; halting");
                            return Err(err);
                        }
                        Err(err) => {
                            warn!(error = %err, "round aborted");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        info!(rounds = self.rounds.len(), "coordinator main loop exited");
        Ok(self.rounds)
    }

    /// Runs a single complete round. Public so callers can drive rounds
    /// manually (one-shot CLI runs, tests) without the interval loop.
    pub async fn execute_round(&mut self) -> Result<RoundRecord> {
        let started_at = Utc::now();

        // Snapshot first: a failed fetch aborts before the round exists.
        let snapshot = Arc::new(self.provider.snapshot().await?);
        if snapshot.is_empty() {
            return Err(GambitError::ProviderUnavailable(
                "snapshot contained no tradable markets".into(),
            ));
        }

        self.round_seq += 1;
        let round_id = self.round_seq;
        let mode = self.effective_mode();
        let treasury_before = self.store.begin_round(round_id).await;

        info!(
            round_id,
            markets = snapshot.len(),
            cash = %treasury_before.available_cash,
            mode = %mode,
            "round opened"
        );
        if !mode.submits_orders() {
            info!(
                round_id,
                "read-only round: proposals are ranked and admitted but never submitted"
            );
        }

        // Phase 1: concurrent proposal collection under a shared deadline.
        let (raw_proposals, participants) = self.collect_proposals(round_id, &snapshot).await;

        // Phase 2: static validation, then deterministic ranking.
        let mut records: Vec<ProposalRecord> = Vec::new();
        let mut candidates = Vec::new();
        for proposal in raw_proposals {
            match proposal.validate(self.config.gateway.min_order_cash) {
                Ok(()) => candidates.push(proposal),
                Err(reason) => {
                    debug!(
                        round_id,
                        strategy_id = %proposal.strategy_id,
                        market_id = %proposal.market_id,
                        %reason,
                        "proposal rejected by validation"
                    );
                    records.push(ProposalRecord {
                        proposal,
                        rank: None,
                        score: Decimal::ZERO,
                        status: ProposalStatus::Rejected(RejectReason::Invalid(reason)),
                    });
                }
            }
        }

        let mut weights: BTreeMap<String, Decimal> = BTreeMap::new();
        for proposal in &candidates {
            if !weights.contains_key(&proposal.strategy_id) {
                let weight = self.store.weight_of(&proposal.strategy_id).await;
                weights.insert(proposal.strategy_id.clone(), weight);
            }
        }
        let ranked = rank_proposals(candidates, |strategy_id| {
            weights.get(strategy_id).copied().unwrap_or(Decimal::ONE)
        });

        // Phase 3: sequential admission against the shared store.
        let mut admitted: Vec<(RankedProposal, Uuid)> = Vec::new();
        for entry in ranked {
            match self.store.reserve(round_id, &entry.proposal).await {
                Ok(reservation_id) => admitted.push((entry, reservation_id)),
                Err(err) => {
                    let reason = match err {
                        StoreError::Conflict { .. } => RejectReason::Conflict,
                        StoreError::InsufficientFunds {
                            requested,
                            available,
                        } => RejectReason::InsufficientFunds {
                            requested,
                            available,
                        },
                        StoreError::InsufficientPosition { requested, held } => {
                            RejectReason::InsufficientFunds {
                                requested,
                                available: held,
                            }
                        }
                        other => return Err(other.into()),
                    };
                    debug!(
                        round_id,
                        rank = entry.rank,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        reason = %reason,
                        "proposal rejected at admission"
                    );
                    records.push(ProposalRecord {
                        proposal: entry.proposal,
                        rank: Some(entry.rank),
                        score: entry.score,
                        status: ProposalStatus::Rejected(reason),
                    });
                }
            }
        }

        // Phase 4: advisory review of the admitted set.
        let mut cleared: Vec<(RankedProposal, Uuid)> = Vec::new();
        for (mut entry, reservation_id) in admitted {
            let verdict = self.review_proposal(round_id, &entry, &snapshot).await;
            match verdict {
                Verdict::Approve { scale } if scale < Decimal::ONE => {
                    let shrunk = (entry.proposal.requested_amount * scale)
                        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
                    let below_minimum = entry.proposal.side == Side::Buy
                        && shrunk < self.config.gateway.min_order_cash;
                    if below_minimum || shrunk <= Decimal::ZERO {
                        self.store.release(reservation_id).await?;
                        info!(
                            round_id,
                            strategy_id = %entry.proposal.strategy_id,
                            market_id = %entry.proposal.market_id,
                            %scale,
                            "advisory scale left stake below the venue minimum; vetoed"
                        );
                        records.push(ProposalRecord {
                            proposal: entry.proposal,
                            rank: Some(entry.rank),
                            score: entry.score,
                            status: ProposalStatus::Vetoed,
                        });
                        continue;
                    }
                    self.store.shrink_reservation(reservation_id, shrunk).await?;
                    debug!(
                        round_id,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        from = %entry.proposal.requested_amount,
                        to = %shrunk,
                        "advisory scaled stake down"
                    );
                    entry.proposal.requested_amount = shrunk;
                    cleared.push((entry, reservation_id));
                }
                Verdict::Approve { .. } => cleared.push((entry, reservation_id)),
                Verdict::Veto { reason } => {
                    self.store.release(reservation_id).await?;
                    info!(
                        round_id,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        %reason,
                        "advisory vetoed proposal"
                    );
                    records.push(ProposalRecord {
                        proposal: entry.proposal,
                        rank: Some(entry.rank),
                        score: entry.score,
                        status: ProposalStatus::Vetoed,
                    });
                }
            }
        }

        // Phase 5: submission and settlement, still in rank order.
        let mut fills: Vec<FillRecord> = Vec::new();
        let mut live = mode.submits_orders();
        for (entry, reservation_id) in cleared {
            if !live {
                self.store.release(reservation_id).await?;
                info!(
                    round_id,
                    rank = entry.rank,
                    strategy_id = %entry.proposal.strategy_id,
                    market_id = %entry.proposal.market_id,
                    "read-only: admitted proposal held back from the gateway"
                );
                records.push(ProposalRecord {
                    proposal: entry.proposal,
                    rank: Some(entry.rank),
                    score: entry.score,
                    status: ProposalStatus::SkippedReadOnly,
                });
                continue;
            }

            match self.gateway.submit(&entry.proposal).await {
                Ok(fill) if fill.is_settleable() => {
                    let outcome = self.store.apply_fill(reservation_id, &fill).await?;
                    info!(
                        round_id,
                        rank = entry.rank,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        side = %entry.proposal.side,
                        price = %fill.fill_price,
                        quantity = %fill.fill_quantity,
                        realized_pnl = %outcome.realized_pnl,
                        "fill settled"
                    );
                    fills.push(FillRecord {
                        proposal_id: entry.proposal.proposal_id,
                        strategy_id: entry.proposal.strategy_id.clone(),
                        market_id: entry.proposal.market_id.clone(),
                        side: entry.proposal.side,
                        fill_price: fill.fill_price,
                        fill_quantity: fill.fill_quantity,
                        cash_delta: outcome.cash_delta,
                        realized_pnl: outcome.realized_pnl,
                        order_id: fill.order_id.clone(),
                        filled_at: Utc::now(),
                    });
                    records.push(ProposalRecord {
                        proposal: entry.proposal,
                        rank: Some(entry.rank),
                        score: entry.score,
                        status: ProposalStatus::Executed,
                    });
                }
                Ok(_) => {
                    self.store.release(reservation_id).await?;
                    warn!(
                        round_id,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        "order reached the venue but did not fill"
                    );
                    records.push(ProposalRecord {
                        proposal: entry.proposal,
                        rank: Some(entry.rank),
                        score: entry.score,
                        status: ProposalStatus::Failed("order did not fill".into()),
                    });
                }
                Err(GatewayError::AuthMissing) => {
                    self.store.release(reservation_id).await?;
                    self.degraded_read_only = true;
                    live = false;
                    warn!(
                        round_id,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        "gateway credentials missing; degrading to read-only"
                    );
                    records.push(ProposalRecord {
                        proposal: entry.proposal,
                        rank: Some(entry.rank),
                        score: entry.score,
                        status: ProposalStatus::SkippedReadOnly,
                    });
                }
                Err(err) => {
                    self.store.release(reservation_id).await?;
                    warn!(
                        round_id,
                        strategy_id = %entry.proposal.strategy_id,
                        market_id = %entry.proposal.market_id,
                        error = %err,
                        "order submission failed"
                    );
                    records.push(ProposalRecord {
                        proposal: entry.proposal,
                        rank: Some(entry.rank),
                        score: entry.score,
                        status: ProposalStatus::Failed(err.to_string()),
                    });
                }
            }
        }

        // Phase 6: reputation updates for every unit that answered in time.
        let perf = aggregate_perf(&participants, &records, &fills);
        let mut pnl_by_strategy = BTreeMap::new();
        for (strategy_id, strategy_perf) in &perf {
            let (before, after) = self.store.update_reputation(strategy_id, strategy_perf).await;
            debug!(
                round_id,
                strategy_id = %strategy_id,
                realized_pnl = %strategy_perf.realized_pnl,
                weight_before = %before,
                weight_after = %after,
                "reputation updated"
            );
            pnl_by_strategy.insert(strategy_id.clone(), strategy_perf.realized_pnl);
        }

        // Phase 7: close the round and check conservation.
        let (treasury_after, audit) = self.store.close_round(round_id).await?;

        Ok(RoundRecord {
            round_id,
            started_at,
            closed_at: Utc::now(),
            mode,
            snapshot: SnapshotRef {
                fetched_at: snapshot.fetched_at,
                market_count: snapshot.len(),
            },
            proposals: records,
            executed: fills,
            treasury_before,
            treasury_after,
            pnl_by_strategy,
            audit,
        })
    }

    fn effective_mode(&self) -> RoundMode {
        if self.degraded_read_only {
            RoundMode::ReadOnly
        } else {
            self.gateway.mode()
        }
    }

    /// Fans proposal generation out to every strategy unit and gathers the
    /// results under one deadline. Units that miss the deadline or return an
    /// error are skipped for the round without a reputation penalty; only
    /// units that answered in time count as participants.
    async fn collect_proposals(
        &self,
        round_id: u64,
        snapshot: &Arc<MarketSnapshot>,
    ) -> (Vec<Proposal>, Vec<String>) {
        let deadline = Duration::from_millis(self.config.round.proposal_timeout_ms);
        let treasury = self.store.treasury().await;
        let positions = self.store.positions().await;

        let mut join_set = JoinSet::new();
        for strategy in &self.strategies {
            let reputation = self.store.reputation(strategy.id()).await;
            let ctx = ProposalContext {
                round_id,
                snapshot: Arc::clone(snapshot),
                treasury,
                positions: positions.clone(),
                reputation,
                market_limit: self.config.round.markets_per_strategy,
            };
            let strategy = Arc::clone(strategy);
            join_set.spawn(async move {
                let outcome = strategy.propose(&ctx).await;
                (strategy.id().to_string(), outcome)
            });
        }

        let mut proposals = Vec::new();
        let mut participants: Vec<String> = Vec::new();
        let drain = async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((strategy_id, Ok(batch))) => {
                        debug!(
                            round_id,
                            strategy_id = %strategy_id,
                            proposals = batch.len(),
                            "strategy answered"
                        );
                        participants.push(strategy_id);
                        proposals.extend(batch);
                    }
                    Ok((strategy_id, Err(err))) => {
                        warn!(
                            round_id,
                            strategy_id = %strategy_id,
                            error = %err,
                            "strategy failed; skipped for the round"
                        );
                    }
                    Err(err) => {
                        warn!(round_id, error = %err, "strategy task panicked");
                    }
                }
            }
        };

        if tokio::time::timeout(deadline, drain).await.is_err() {
            join_set.abort_all();
            let answered: HashSet<&str> = participants.iter().map(String::as_str).collect();
            for strategy in &self.strategies {
                if !answered.contains(strategy.id()) {
                    let err = GambitError::StrategyTimeout {
                        strategy_id: strategy.id().to_string(),
                    };
                    warn!(
                        round_id,
                        timeout_ms = self.config.round.proposal_timeout_ms,
                        error = %err,
                        "strategy missed the proposal deadline; skipped for the round"
                    );
                }
            }
        }

        participants.sort();
        (proposals, participants)
    }

    /// Asks the advisor about one admitted proposal, applying the configured
    /// failure policy when the advisor is unreachable or too slow.
    async fn review_proposal(
        &self,
        round_id: u64,
        entry: &RankedProposal,
        snapshot: &MarketSnapshot,
    ) -> Verdict {
        let Some(advisor) = &self.advisor else {
            return Verdict::approve();
        };

        let market = snapshot.find(&entry.proposal.market_id);
        let deadline = Duration::from_millis(self.config.advisory.timeout_ms);
        let review = tokio::time::timeout(deadline, advisor.review(&entry.proposal, market)).await;

        let failure = match review {
            Ok(Ok(verdict)) => return verdict,
            Ok(Err(err)) => err,
            Err(_) => GambitError::AdvisoryTimeout,
        };

        match self.config.advisory.fail_policy {
            FailPolicy::Open => {
                warn!(
                    round_id,
                    strategy_id = %entry.proposal.strategy_id,
                    market_id = %entry.proposal.market_id,
                    error = %failure,
                    "advisor unavailable; failing open"
                );
                Verdict::approve()
            }
            FailPolicy::Closed => {
                warn!(
                    round_id,
                    strategy_id = %entry.proposal.strategy_id,
                    market_id = %entry.proposal.market_id,
                    error = %failure,
                    "advisor unavailable; failing closed"
                );
                Verdict::Veto {
                    reason: format!("advisor unavailable ({failure})"),
                }
            }
        }
    }
}
