use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::PositionKey;
use crate::error::StoreError;

/// One open position, mutated only by confirmed fills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub key: PositionKey,
    pub quantity: Decimal,
    pub average_entry_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Cost basis of the position
    pub fn deployed(&self) -> Decimal {
        self.quantity * self.average_entry_price
    }
}

/// The long book: positions keyed by (market, side)
#[derive(Debug, Default, Clone)]
pub(crate) struct PositionBook {
    positions: HashMap<PositionKey, Position>,
}

impl PositionBook {
    pub fn quantity(&self, key: &PositionKey) -> Decimal {
        self.positions
            .get(key)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    /// All open positions, ordered by key for stable iteration
    pub fn all(&self) -> Vec<Position> {
        let mut out: Vec<Position> = self.positions.values().cloned().collect();
        out.sort_by(|a, b| {
            a.key
                .market_id
                .cmp(&b.key.market_id)
                .then(a.key.side.cmp(&b.key.side))
        });
        out
    }

    /// Sum of all position cost bases; must equal the treasury's deployed bucket
    pub fn total_cost_basis(&self) -> Decimal {
        self.positions.values().map(Position::deployed).sum()
    }

    /// Extend (or open) a position from a buy fill, re-averaging the entry
    pub fn apply_buy(
        &mut self,
        key: PositionKey,
        quantity: Decimal,
        price: Decimal,
        at: DateTime<Utc>,
    ) {
        match self.positions.get_mut(&key) {
            Some(position) => {
                let total_cost = position.deployed() + quantity * price;
                position.quantity += quantity;
                if position.quantity > Decimal::ZERO {
                    position.average_entry_price = total_cost / position.quantity;
                }
            }
            None => {
                self.positions.insert(
                    key.clone(),
                    Position {
                        key,
                        quantity,
                        average_entry_price: price,
                        opened_at: at,
                    },
                );
            }
        }
    }

    /// Reduce a position from a sell fill; returns the removed cost basis.
    ///
    /// Admission has already checked the holding, so a shortfall here means
    /// the store and the book disagree.
    pub fn apply_sell(
        &mut self,
        key: &PositionKey,
        quantity: Decimal,
    ) -> std::result::Result<Decimal, StoreError> {
        let position = self.positions.get_mut(key).ok_or_else(|| {
            StoreError::Corruption(format!("sell fill against missing position {key}"))
        })?;
        if quantity > position.quantity {
            return Err(StoreError::Corruption(format!(
                "sell fill of {quantity} exceeds held {} on {key}",
                position.quantity
            )));
        }

        let cost_basis_removed = quantity * position.average_entry_price;
        position.quantity -= quantity;
        if position.quantity == Decimal::ZERO {
            self.positions.remove(key);
        }
        Ok(cost_basis_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use rust_decimal_macros::dec;

    fn key() -> PositionKey {
        PositionKey::new("token-1", Side::Buy)
    }

    #[test]
    fn test_apply_buy_averages_entry_price() {
        let mut book = PositionBook::default();
        book.apply_buy(key(), dec!(10), dec!(0.50), Utc::now());
        book.apply_buy(key(), dec!(10), dec!(0.70), Utc::now());

        let position = book.get(&key()).unwrap();
        assert_eq!(position.quantity, dec!(20));
        assert_eq!(position.average_entry_price, dec!(0.60));
        assert_eq!(book.total_cost_basis(), dec!(12));
    }

    #[test]
    fn test_apply_sell_removes_cost_basis_and_drops_empty() {
        let mut book = PositionBook::default();
        book.apply_buy(key(), dec!(10), dec!(0.50), Utc::now());

        let removed = book.apply_sell(&key(), dec!(4)).unwrap();
        assert_eq!(removed, dec!(2.0));
        assert_eq!(book.quantity(&key()), dec!(6));

        book.apply_sell(&key(), dec!(6)).unwrap();
        assert!(book.get(&key()).is_none());
        assert!(book.all().is_empty());
    }

    #[test]
    fn test_apply_sell_rejects_overdraw() {
        let mut book = PositionBook::default();
        book.apply_buy(key(), dec!(5), dec!(0.50), Utc::now());

        let err = book.apply_sell(&key(), dec!(6)).unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));

        let missing = PositionKey::new("token-2", Side::Buy);
        let err = book.apply_sell(&missing, dec!(1)).unwrap_err();
        assert!(matches!(err, StoreError::Corruption(_)));
    }
}
