//! Run reports: a JSON artifact per run plus a terminal leaderboard.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::info;

use crate::domain::{RoundRecord, TreasuryView};
use crate::error::Result;
use crate::store::ReputationRecord;

/// Everything a run produced, serialized verbatim so a round can be replayed
/// or audited offline.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub generated_at: chrono::DateTime<Utc>,
    pub rounds_completed: usize,
    pub treasury: Option<TreasuryView>,
    pub total_pnl: Decimal,
    pub leaderboard: Vec<ReputationRecord>,
    pub rounds: Vec<RoundRecord>,
}

impl RunReport {
    pub fn new(rounds: Vec<RoundRecord>, leaderboard: Vec<ReputationRecord>) -> Self {
        let total_pnl = rounds.iter().map(RoundRecord::round_pnl).sum();
        Self {
            generated_at: Utc::now(),
            rounds_completed: rounds.len(),
            treasury: rounds.last().map(|r| r.treasury_after),
            total_pnl,
            leaderboard,
            rounds,
        }
    }

    /// Writes the report as pretty JSON under `dir`, named by timestamp.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let name = format!("run_{}.json", self.generated_at.format("%Y%m%dT%H%M%SZ"));
        let path = dir.join(name);
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, body)?;
        info!(path = %path.display(), rounds = self.rounds_completed, "run report written");
        Ok(path)
    }
}

#[derive(Debug, Serialize, Tabled)]
struct LeaderboardRow {
    strategy: String,
    weight: String,
    rounds: String,
    proposals: String,
    executed: String,
    rejected: String,
    win_rate: String,
    pnl: String,
}

impl From<&ReputationRecord> for LeaderboardRow {
    fn from(rep: &ReputationRecord) -> Self {
        Self {
            strategy: rep.strategy_id.clone(),
            weight: rep.current_weight.round_dp(3).to_string(),
            rounds: rep.rounds_participated.to_string(),
            proposals: rep.proposals_made.to_string(),
            executed: rep.proposals_executed.to_string(),
            rejected: rep.proposals_rejected.to_string(),
            win_rate: rep
                .win_rate()
                .map(|r| format!("{}%", (r * Decimal::ONE_HUNDRED).round_dp(1)))
                .unwrap_or_else(|| "-".to_string()),
            pnl: rep.realized_pnl_attributed.round_dp(2).to_string(),
        }
    }
}

/// Renders the per-strategy leaderboard, best weight first.
pub fn leaderboard_table(reputation: &[ReputationRecord]) -> String {
    if reputation.is_empty() {
        return "(no strategies participated)".to_string();
    }
    let mut ranked: Vec<&ReputationRecord> = reputation.iter().collect();
    ranked.sort_by(|a, b| {
        b.current_weight
            .cmp(&a.current_weight)
            .then_with(|| a.strategy_id.cmp(&b.strategy_id))
    });
    let rows: Vec<LeaderboardRow> = ranked.into_iter().map(LeaderboardRow::from).collect();
    Table::new(rows).to_string()
}
