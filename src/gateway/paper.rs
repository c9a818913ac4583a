//! Paper gateway: synthetic fills at the proposal's own limit price.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::domain::{Fill, Proposal, RoundMode, Side};
use crate::error::GatewayError;

use super::ExecutionGateway;

/// Fills everything immediately at the limit, shares floored so a buy's
/// cost never exceeds the cash reserved for it
#[derive(Debug, Default)]
pub struct PaperGateway;

impl PaperGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionGateway for PaperGateway {
    fn mode(&self) -> RoundMode {
        RoundMode::Paper
    }

    async fn submit(&self, proposal: &Proposal) -> Result<Fill, GatewayError> {
        let quantity = match proposal.side {
            Side::Buy => (proposal.requested_amount / proposal.target_price)
                .round_dp_with_strategy(4, RoundingStrategy::ToZero),
            Side::Sell => proposal.requested_amount,
        };
        if quantity <= Decimal::ZERO {
            return Ok(Fill::unfilled());
        }
        debug!(
            proposal_id = %proposal.proposal_id,
            side = %proposal.side,
            %quantity,
            price = %proposal.target_price,
            "paper fill"
        );
        Ok(Fill::filled(proposal.target_price, quantity)
            .with_order_id(format!("paper-{}", proposal.proposal_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_buy_fill_cost_never_exceeds_reserved_cash() {
        let proposal = Proposal::buy("momentum", "token-1", dec!(10), dec!(0.33), dec!(0.8));
        let fill = PaperGateway::new().submit(&proposal).await.unwrap();
        assert!(fill.filled);
        assert_eq!(fill.fill_price, dec!(0.33));
        // 10 / 0.33 floored to 4 decimals
        assert_eq!(fill.fill_quantity, dec!(30.3030));
        assert!(fill.fill_price * fill.fill_quantity <= dec!(10));
    }

    #[tokio::test]
    async fn test_sell_fill_returns_exact_share_count() {
        let proposal = Proposal::sell("value", "token-1", dec!(42), dec!(0.88), dec!(0.7));
        let fill = PaperGateway::new().submit(&proposal).await.unwrap();
        assert!(fill.filled);
        assert_eq!(fill.fill_quantity, dec!(42));
        assert!(fill.order_id.unwrap().starts_with("paper-"));
    }

    #[tokio::test]
    async fn test_mode_is_paper() {
        assert_eq!(PaperGateway::new().mode(), RoundMode::Paper);
    }
}
