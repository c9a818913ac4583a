//! Execution gateways: where admitted proposals become orders.
//!
//! The coordinator talks to exactly one gateway per run. A gateway with
//! no usable credentials still constructs; it reports itself read-only
//! and refuses submissions with [`GatewayError::AuthMissing`], which the
//! coordinator turns into skip-and-log rather than a failed round.

pub mod clob;
pub mod paper;

pub use clob::{ApiCredentials, ClobGateway};
pub use paper::PaperGateway;

use async_trait::async_trait;

use crate::domain::{Fill, Proposal, RoundMode};
use crate::error::GatewayError;

/// Submits admitted proposals to a venue, or pretends to
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// The round mode this gateway can operate in
    fn mode(&self) -> RoundMode;

    /// Submit one proposal and report its terminal fill.
    ///
    /// `Ok` with `filled == false` means the venue answered and nothing
    /// crossed; errors distinguish rejection, transport failure and
    /// missing credentials.
    async fn submit(&self, proposal: &Proposal) -> Result<Fill, GatewayError>;
}
