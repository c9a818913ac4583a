use rust_decimal::Decimal;

use crate::domain::TreasuryView;
use crate::error::StoreError;

/// The shared cash pool.
///
/// Cash moves between three buckets only: `available` (free to reserve),
/// `reserved` (held by in-flight proposals), `deployed` (cost basis of open
/// positions). Every transition is all-or-nothing.
#[derive(Debug, Clone)]
pub(crate) struct Treasury {
    available_cash: Decimal,
    reserved_cash: Decimal,
    total_deployed: Decimal,
}

impl Treasury {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            available_cash: initial_cash,
            reserved_cash: Decimal::ZERO,
            total_deployed: Decimal::ZERO,
        }
    }

    pub fn view(&self) -> TreasuryView {
        TreasuryView {
            available_cash: self.available_cash,
            reserved_cash: self.reserved_cash,
            total_deployed: self.total_deployed,
        }
    }

    pub fn available(&self) -> Decimal {
        self.available_cash
    }

    pub fn reserved(&self) -> Decimal {
        self.reserved_cash
    }

    pub fn deployed(&self) -> Decimal {
        self.total_deployed
    }

    /// Move cash available -> reserved; fails without touching state
    pub fn reserve(&mut self, cash: Decimal) -> std::result::Result<(), StoreError> {
        if cash > self.available_cash {
            return Err(StoreError::InsufficientFunds {
                requested: cash,
                available: self.available_cash,
            });
        }
        self.available_cash -= cash;
        self.reserved_cash += cash;
        Ok(())
    }

    /// Move cash reserved -> available
    pub fn release(&mut self, cash: Decimal) -> std::result::Result<(), StoreError> {
        if cash > self.reserved_cash {
            return Err(StoreError::Corruption(format!(
                "release of {cash} exceeds reserved {}",
                self.reserved_cash
            )));
        }
        self.reserved_cash -= cash;
        self.available_cash += cash;
        Ok(())
    }

    /// Convert a buy reservation into deployed cost, refunding the unspent part
    pub fn settle_buy(
        &mut self,
        reserved: Decimal,
        cost: Decimal,
    ) -> std::result::Result<(), StoreError> {
        if cost > reserved {
            return Err(StoreError::Corruption(format!(
                "fill cost {cost} exceeds reservation {reserved}"
            )));
        }
        if reserved > self.reserved_cash {
            return Err(StoreError::Corruption(format!(
                "settle of {reserved} exceeds reserved {}",
                self.reserved_cash
            )));
        }
        self.reserved_cash -= reserved;
        self.available_cash += reserved - cost;
        self.total_deployed += cost;
        Ok(())
    }

    /// Credit sale proceeds and remove the sold cost basis
    pub fn settle_sell(
        &mut self,
        proceeds: Decimal,
        cost_basis_removed: Decimal,
    ) -> std::result::Result<(), StoreError> {
        if cost_basis_removed > self.total_deployed {
            return Err(StoreError::Corruption(format!(
                "cost basis removal {cost_basis_removed} exceeds deployed {}",
                self.total_deployed
            )));
        }
        self.total_deployed -= cost_basis_removed;
        self.available_cash += proceeds;
        Ok(())
    }
}
