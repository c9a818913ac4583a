//! Round orchestration: ranking, admission, settlement aggregation, and the
//! coordinator that sequences them.

pub mod coordinator;
pub mod ranking;
pub mod settlement;

pub use coordinator::RoundCoordinator;
pub use ranking::{rank_proposals, RankedProposal};
pub use settlement::aggregate_perf;
