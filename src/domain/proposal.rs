use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::market::{PositionKey, Side};

/// A candidate trade submitted by one strategy for one round.
///
/// Immutable once created; the coordinator consumes it exactly once and
/// records the outcome next to it in the round log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: Uuid,
    pub strategy_id: String,
    /// Outcome token id
    pub market_id: String,
    /// Market question, carried for the audit trail
    pub question: String,
    pub side: Side,
    /// Cash (USD) for BUY, share units for SELL
    pub requested_amount: Decimal,
    pub target_price: Decimal,
    /// Strategy conviction in [0, 1]
    pub confidence: Decimal,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn buy(
        strategy_id: impl Into<String>,
        market_id: impl Into<String>,
        cash: Decimal,
        target_price: Decimal,
        confidence: Decimal,
    ) -> Self {
        Self::new(strategy_id, market_id, Side::Buy, cash, target_price, confidence)
    }

    pub fn sell(
        strategy_id: impl Into<String>,
        market_id: impl Into<String>,
        shares: Decimal,
        target_price: Decimal,
        confidence: Decimal,
    ) -> Self {
        Self::new(
            strategy_id,
            market_id,
            Side::Sell,
            shares,
            target_price,
            confidence,
        )
    }

    fn new(
        strategy_id: impl Into<String>,
        market_id: impl Into<String>,
        side: Side,
        requested_amount: Decimal,
        target_price: Decimal,
        confidence: Decimal,
    ) -> Self {
        Self {
            proposal_id: Uuid::new_v4(),
            strategy_id: strategy_id.into(),
            market_id: market_id.into(),
            question: String::new(),
            side,
            requested_amount,
            target_price,
            confidence,
            rationale: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// The `(market_id, side)` pair this proposal claims for the round
    pub fn claim_key(&self) -> PositionKey {
        PositionKey::new(self.market_id.clone(), self.side)
    }

    /// The long-book slot a fill of this proposal mutates.
    ///
    /// Operation is long-only: SELL fills reduce the BUY-side position.
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.market_id.clone(), Side::Buy)
    }

    /// Cash value of the request at the target price
    pub fn notional_value(&self) -> Decimal {
        match self.side {
            Side::Buy => self.requested_amount,
            Side::Sell => self.requested_amount * self.target_price,
        }
    }

    /// Shares this proposal would move if filled exactly at target
    pub fn estimated_shares(&self) -> Decimal {
        match self.side {
            Side::Buy => {
                if self.target_price > Decimal::ZERO {
                    self.requested_amount / self.target_price
                } else {
                    Decimal::ZERO
                }
            }
            Side::Sell => self.requested_amount,
        }
    }

    /// Guard rails applied before ranking; violations never reach admission
    pub fn validate(&self, min_order_cash: Decimal) -> std::result::Result<(), String> {
        if self.requested_amount <= Decimal::ZERO {
            return Err(format!(
                "requested_amount must be positive, got {}",
                self.requested_amount
            ));
        }
        if self.target_price <= Decimal::ZERO || self.target_price >= Decimal::ONE {
            return Err(format!(
                "target_price must lie in (0, 1), got {}",
                self.target_price
            ));
        }
        if self.confidence < Decimal::ZERO || self.confidence > Decimal::ONE {
            return Err(format!(
                "confidence must lie in [0, 1], got {}",
                self.confidence
            ));
        }
        if self.side == Side::Buy && self.requested_amount < min_order_cash {
            return Err(format!(
                "buy of {} below venue minimum {}",
                self.requested_amount, min_order_cash
            ));
        }
        Ok(())
    }
}

/// Why a proposal was turned away before execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Treasury (or held shares, for sells) cannot cover the request
    InsufficientFunds { requested: Decimal, available: Decimal },
    /// A higher-ranked proposal already claimed the same (market, side)
    Conflict,
    /// Failed basic validation before ranking
    Invalid(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InsufficientFunds {
                requested,
                available,
            } => write!(f, "insufficient funds ({requested} > {available})"),
            RejectReason::Conflict => write!(f, "reservation conflict"),
            RejectReason::Invalid(msg) => write!(f, "invalid proposal: {msg}"),
        }
    }
}

/// Terminal state of a proposal within its round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Reserved, awaiting advisory/execution
    Admitted,
    /// Filled and settled into the treasury
    Executed,
    /// Turned away at validation or admission
    Rejected(RejectReason),
    /// Admitted, then struck down by the advisory layer
    Vetoed,
    /// Admitted, but the gateway could not fill it
    Failed(String),
    /// Admitted in read-only mode; submission skipped
    SkippedReadOnly,
}

impl ProposalStatus {
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Rejected(_) | ProposalStatus::Vetoed | ProposalStatus::Failed(_)
        )
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Admitted => write!(f, "admitted"),
            ProposalStatus::Executed => write!(f, "executed"),
            ProposalStatus::Rejected(reason) => write!(f, "rejected: {reason}"),
            ProposalStatus::Vetoed => write!(f, "vetoed"),
            ProposalStatus::Failed(msg) => write!(f, "failed: {msg}"),
            ProposalStatus::SkippedReadOnly => write!(f, "skipped (read-only)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_buy() -> Proposal {
        Proposal::buy("momentum", "token-1", dec!(25), dec!(0.70), dec!(0.8))
            .with_question("Will it happen?")
            .with_rationale("price strength above threshold")
    }

    #[test]
    fn test_claim_key_follows_proposal_side() {
        let buy = sample_buy();
        assert_eq!(buy.claim_key(), PositionKey::new("token-1", Side::Buy));

        let sell = Proposal::sell("value", "token-1", dec!(10), dec!(0.90), dec!(0.6));
        assert_eq!(sell.claim_key(), PositionKey::new("token-1", Side::Sell));
        // Fills of either side land on the long book
        assert_eq!(sell.position_key(), PositionKey::new("token-1", Side::Buy));
    }

    #[test]
    fn test_estimated_shares() {
        let buy = sample_buy();
        // 25 / 0.70
        assert!(buy.estimated_shares() > dec!(35.7));
        assert!(buy.estimated_shares() < dec!(35.8));

        let sell = Proposal::sell("value", "token-1", dec!(10), dec!(0.90), dec!(0.6));
        assert_eq!(sell.estimated_shares(), dec!(10));
        assert_eq!(sell.notional_value(), dec!(9));
    }

    #[test]
    fn test_validate_guard_rails() {
        assert!(sample_buy().validate(dec!(1)).is_ok());

        let tiny = Proposal::buy("m", "t", dec!(0.5), dec!(0.5), dec!(0.5));
        assert!(tiny.validate(dec!(1)).is_err());

        let bad_price = Proposal::buy("m", "t", dec!(10), dec!(1.2), dec!(0.5));
        assert!(bad_price.validate(dec!(1)).is_err());

        let bad_conf = Proposal::buy("m", "t", dec!(10), dec!(0.5), dec!(1.5));
        assert!(bad_conf.validate(dec!(1)).is_err());

        let negative = Proposal::sell("m", "t", dec!(-3), dec!(0.5), dec!(0.5));
        assert!(negative.validate(dec!(1)).is_err());
    }
}
