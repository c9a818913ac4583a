use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Order side of a proposal or position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err("invalid side; expected buy|sell"),
        }
    }
}

/// Key identifying a position slot and the per-round reservation claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub market_id: String,
    pub side: Side,
}

impl PositionKey {
    pub fn new(market_id: impl Into<String>, side: Side) -> Self {
        Self {
            market_id: market_id.into(),
            side,
        }
    }
}

impl std::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.market_id, self.side)
    }
}

/// One tradeable outcome token as seen by the strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketView {
    /// Outcome token id; the unit markets are keyed and traded by
    pub market_id: String,
    /// Parent condition id on the venue
    pub condition_id: String,
    pub question: String,
    /// Outcome label ("Yes" / "No" / team name)
    pub outcome: String,
    /// Mid price in (0, 1)
    pub price: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    /// Lifetime traded volume in USD
    pub volume_usd: Decimal,
    pub liquidity_usd: Decimal,
    pub end_date: Option<DateTime<Utc>>,
}

impl MarketView {
    /// Bid/ask spread when both sides are quoted
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Check the market has not resolved/expired at `now`
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        match self.end_date {
            Some(end) => end > now,
            None => true,
        }
    }

    /// Price of the complementary outcome in a binary market
    pub fn complement_price(&self) -> Decimal {
        Decimal::ONE - self.price
    }
}

/// Read-only view of the tradeable universe for one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Markets ordered by descending volume
    pub markets: Vec<MarketView>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn new(markets: Vec<MarketView>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            markets,
            fetched_at,
        }
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// The top `n` markets by volume
    pub fn top(&self, n: usize) -> &[MarketView] {
        &self.markets[..self.markets.len().min(n)]
    }

    pub fn find(&self, market_id: &str) -> Option<&MarketView> {
        self.markets.iter().find(|m| m.market_id == market_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_market(id: &str, price: Decimal) -> MarketView {
        MarketView {
            market_id: id.to_string(),
            condition_id: format!("cond-{id}"),
            question: "Will it happen?".to_string(),
            outcome: "Yes".to_string(),
            price,
            best_bid: Some(price - dec!(0.01)),
            best_ask: Some(price + dec!(0.01)),
            volume_usd: dec!(50000),
            liquidity_usd: dec!(12000),
            end_date: Some(Utc::now() + chrono::Duration::days(7)),
        }
    }

    #[test]
    fn test_side_parse_round_trip() {
        assert_eq!(Side::from_str("BUY").unwrap(), Side::Buy);
        assert_eq!(Side::from_str(" sell ").unwrap(), Side::Sell);
        assert!(Side::from_str("hold").is_err());
        assert_eq!(Side::Buy.to_string(), "BUY");
    }

    #[test]
    fn test_position_key_display() {
        let key = PositionKey::new("token-1", Side::Buy);
        assert_eq!(key.to_string(), "token-1/BUY");
    }

    #[test]
    fn test_market_spread_and_complement() {
        let market = sample_market("token-1", dec!(0.60));
        assert_eq!(market.spread(), Some(dec!(0.02)));
        assert_eq!(market.complement_price(), dec!(0.40));
    }

    #[test]
    fn test_snapshot_top_clamps_to_len() {
        let snapshot = MarketSnapshot::new(
            vec![
                sample_market("a", dec!(0.5)),
                sample_market("b", dec!(0.7)),
            ],
            Utc::now(),
        );
        assert_eq!(snapshot.top(10).len(), 2);
        assert_eq!(snapshot.top(1)[0].market_id, "a");
        assert!(snapshot.find("b").is_some());
        assert!(snapshot.find("c").is_none());
    }
}
