//! Strategy units that turn a market snapshot into trade proposals.
//!
//! Each unit is a pure decider: the coordinator snapshots shared state,
//! fans it out to every enabled unit concurrently, and collects whatever
//! proposals come back before the round deadline. Units hold no mutable
//! state of their own; randomness is seeded from `(round_id, strategy_id)`
//! so a replayed round reproduces every draw.

pub mod contrarian;
pub mod llm;
pub mod momentum;
pub mod value;
pub mod whale;

pub use contrarian::ContrarianStrategy;
pub use llm::LlmStrategy;
pub use momentum::MomentumStrategy;
pub use value::ValueStrategy;
pub use whale::WhaleStrategy;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::advisory::ChatClient;
use crate::domain::{MarketSnapshot, MarketView, Proposal, TreasuryView};
use crate::error::{GambitError, Result};
use crate::store::{Position, ReputationRecord};

/// Read-only round inputs handed to a strategy unit.
///
/// One context is built per unit per round; `reputation` is the receiving
/// unit's own record.
#[derive(Debug, Clone)]
pub struct ProposalContext {
    pub round_id: u64,
    pub snapshot: Arc<MarketSnapshot>,
    pub treasury: TreasuryView,
    /// Open long positions at snapshot time
    pub positions: Vec<Position>,
    pub reputation: ReputationRecord,
    /// How many top-volume markets the unit may consider
    pub market_limit: usize,
}

impl ProposalContext {
    /// Tradeable universe for this round, largest markets first
    pub fn markets(&self) -> &[MarketView] {
        self.snapshot.top(self.market_limit)
    }

    /// Shares held long in `market_id` at snapshot time
    pub fn held_quantity(&self, market_id: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.key.market_id == market_id)
            .map(|p| p.quantity)
            .sum()
    }

    pub fn weight(&self) -> Decimal {
        self.reputation.current_weight
    }

    /// Rng seeded from `(round_id, strategy_id)`
    pub fn rng(&self, strategy_id: &str) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(self.round_id.to_be_bytes());
        hasher.update(strategy_id.as_bytes());
        let digest = hasher.finalize();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        StdRng::from_seed(seed)
    }
}

/// One autonomous strategy unit.
///
/// `propose` runs under the round's shared deadline; a unit that overruns
/// it is skipped for the round without penalty.
#[async_trait]
pub trait Strategy: Send + Sync + 'static {
    /// Stable identifier; ranking tie-breaks and reputation key off it
    fn id(&self) -> &str;

    /// Human-readable name for logs and reports
    fn name(&self) -> &str;

    /// Produce zero or more proposals from the round context
    async fn propose(&self, ctx: &ProposalContext) -> Result<Vec<Proposal>>;
}

/// The closed set of built-in strategy units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Momentum,
    Contrarian,
    Value,
    Whale,
    Llm,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Momentum,
        StrategyKind::Contrarian,
        StrategyKind::Value,
        StrategyKind::Whale,
        StrategyKind::Llm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Momentum => "momentum",
            StrategyKind::Contrarian => "contrarian",
            StrategyKind::Value => "value",
            StrategyKind::Whale => "whale",
            StrategyKind::Llm => "llm",
        }
    }

    /// Instantiate the unit. `chat` is required by the llm unit only.
    pub fn build(&self, chat: Option<Arc<ChatClient>>) -> Result<Arc<dyn Strategy>> {
        match self {
            StrategyKind::Momentum => Ok(Arc::new(MomentumStrategy::new())),
            StrategyKind::Contrarian => Ok(Arc::new(ContrarianStrategy::new())),
            StrategyKind::Value => Ok(Arc::new(ValueStrategy::new())),
            StrategyKind::Whale => Ok(Arc::new(WhaleStrategy::new())),
            StrategyKind::Llm => {
                let chat = chat.ok_or_else(|| {
                    GambitError::Validation(
                        "llm strategy requires an advisory chat endpoint".to_string(),
                    )
                })?;
                Ok(Arc::new(LlmStrategy::new(chat)))
            }
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = GambitError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "momentum" => Ok(StrategyKind::Momentum),
            "contrarian" => Ok(StrategyKind::Contrarian),
            "value" => Ok(StrategyKind::Value),
            "whale" => Ok(StrategyKind::Whale),
            "llm" => Ok(StrategyKind::Llm),
            other => Err(GambitError::Validation(format!(
                "unknown strategy '{other}'"
            ))),
        }
    }
}

/// Build the round roster from configured names.
///
/// Unknown or duplicate names are configuration errors.
pub fn build_roster(
    names: &[String],
    chat: Option<&Arc<ChatClient>>,
) -> Result<Vec<Arc<dyn Strategy>>> {
    let mut seen = HashSet::new();
    let mut roster: Vec<Arc<dyn Strategy>> = Vec::with_capacity(names.len());
    for name in names {
        let kind: StrategyKind = name.parse()?;
        if !seen.insert(kind) {
            return Err(GambitError::Validation(format!(
                "strategy '{kind}' enabled twice"
            )));
        }
        roster.push(kind.build(chat.cloned())?);
    }
    Ok(roster)
}

/// Cash for one BUY sized by treasury share and reputation weight,
/// rounded to cents and capped at available cash.
pub(crate) fn sized_cash(ctx: &ProposalContext, pct: Decimal) -> Decimal {
    let sized = (ctx.treasury.available_cash * pct * ctx.weight()).round_dp(2);
    sized.min(ctx.treasury.available_cash)
}
