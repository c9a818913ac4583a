//! Market data providers.

pub mod gamma;

pub use gamma::GammaProvider;

use async_trait::async_trait;

use crate::domain::MarketSnapshot;
use crate::error::Result;

/// Produces the immutable market snapshot each round starts from.
///
/// A failure here aborts the round before any state is touched; the
/// coordinator retries on the next tick.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self) -> Result<MarketSnapshot>;
}
