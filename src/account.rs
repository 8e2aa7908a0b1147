//! Accounts, stock lots, and the credit line attached to each account.
//!
//! Every buy opens a new lot. Lots of the same instrument are never merged,
//! so selling always works against the first lot held for that instrument.

use crate::types::{AccountId, InstrumentId, Price, Quantity, Quote};
use serde::{Deserialize, Serialize};

/// One purchased batch of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub instrument_id: InstrumentId,
    pub quantity: Quantity,
    pub purchase_price: Price,
    pub total_investment: Quote,
}

impl Position {
    pub fn open(instrument_id: InstrumentId, quantity: Quantity, price: Price) -> Self {
        Self {
            instrument_id,
            quantity,
            purchase_price: price,
            total_investment: price.times(quantity),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub cash_balance: Quote,
    pub loan_balance: Quote,
    pub loan_limit: Quote,
    pub holdings: Vec<Position>,
    pub trading_enabled: bool,
    /// Cached by the price tick. Not authoritative between ticks.
    pub profit_loss: Quote,
}

/// How a lot changed during a sell, kept so the change can be reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotReduction {
    Reduced { index: usize, by: Quantity },
    Removed { index: usize, lot: Position },
}

impl Account {
    pub fn new(id: AccountId, name: impl Into<String>, loan_limit: Quote) -> Self {
        Self {
            id,
            name: name.into(),
            cash_balance: Quote::zero(),
            loan_balance: Quote::zero(),
            loan_limit,
            holdings: Vec::new(),
            trading_enabled: true,
            profit_loss: Quote::zero(),
        }
    }

    pub fn with_cash(mut self, cash: Quote) -> Self {
        self.cash_balance = cash;
        self
    }

    /// Headroom left under the fixed loan ceiling.
    pub fn available_credit(&self) -> Quote {
        self.loan_limit.saturating_sub(self.loan_balance)
    }

    /// Refuses an amount that would push cash past the decimal range.
    pub fn credit(&mut self, amount: Quote) -> Result<(), AccountError> {
        self.cash_balance = self
            .cash_balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow { balance: self.cash_balance, amount })?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Quote) {
        self.cash_balance = self.cash_balance.sub(amount);
    }

    // compared against headroom so an oversized request never gets added
    pub fn draw_loan(&mut self, amount: Quote) -> Result<(), AccountError> {
        if amount > self.available_credit() {
            return Err(AccountError::LoanLimitExceeded {
                current: self.loan_balance,
                limit: self.loan_limit,
                requested: amount,
            });
        }
        self.credit(amount)?;
        self.loan_balance = self.loan_balance.add(amount);
        Ok(())
    }

    pub fn first_lot(&self, instrument_id: InstrumentId) -> Option<(usize, &Position)> {
        self.holdings
            .iter()
            .enumerate()
            .find(|(_, lot)| lot.instrument_id == instrument_id)
    }

    /// Total shares of an instrument across all lots.
    pub fn shares_of(&self, instrument_id: InstrumentId) -> Quantity {
        self.holdings
            .iter()
            .filter(|lot| lot.instrument_id == instrument_id)
            .map(|lot| lot.quantity)
            .sum()
    }

    /// Take `quantity` from the first lot of `instrument_id`.
    /// Only that lot is considered, even if later lots could cover the rest.
    pub fn reduce_first_lot(
        &mut self,
        instrument_id: InstrumentId,
        quantity: Quantity,
    ) -> Result<LotReduction, AccountError> {
        let Some((index, lot)) = self.first_lot(instrument_id) else {
            return Err(AccountError::InsufficientHoldings {
                instrument_id,
                requested: quantity,
                held: 0,
            });
        };
        if lot.quantity < quantity {
            return Err(AccountError::InsufficientHoldings {
                instrument_id,
                requested: quantity,
                held: lot.quantity,
            });
        }

        if lot.quantity == quantity {
            let lot = self.holdings.remove(index);
            Ok(LotReduction::Removed { index, lot })
        } else {
            self.holdings[index].quantity -= quantity;
            Ok(LotReduction::Reduced { index, by: quantity })
        }
    }

    pub fn undo_reduction(&mut self, reduction: LotReduction) {
        match reduction {
            LotReduction::Reduced { index, by } => self.holdings[index].quantity += by,
            LotReduction::Removed { index, lot } => self.holdings.insert(index, lot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Loan limit exceeded: current {current}, limit {limit}, requested {requested}")]
    LoanLimitExceeded {
        current: Quote,
        limit: Quote,
        requested: Quote,
    },

    #[error("Insufficient holdings of {instrument_id}: requested {requested}, held {held}")]
    InsufficientHoldings {
        instrument_id: InstrumentId,
        requested: Quantity,
        held: Quantity,
    },

    #[error("Cash balance {balance} cannot absorb {amount}")]
    BalanceOverflow { balance: Quote, amount: Quote },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn test_account() -> Account {
        Account::new(AccountId(1), "alice", Quote::new(dec!(100000))).with_cash(Quote::new(dec!(1000)))
    }

    fn lot(instrument: u64, quantity: Quantity) -> Position {
        Position::open(InstrumentId(instrument), quantity, Price::new_unchecked(dec!(10)))
    }

    #[test]
    fn loan_draw_credits_cash() {
        let mut account = test_account();
        account.draw_loan(Quote::new(dec!(2500))).unwrap();
        assert_eq!(account.loan_balance.value(), dec!(2500));
        assert_eq!(account.cash_balance.value(), dec!(3500));
        assert_eq!(account.available_credit().value(), dec!(97500));
    }

    #[test]
    fn loan_ceiling_is_inclusive() {
        let mut account = test_account();
        account.draw_loan(Quote::new(dec!(100000))).unwrap();
        let err = account.draw_loan(Quote::new(dec!(0.01))).unwrap_err();
        assert!(matches!(err, AccountError::LoanLimitExceeded { .. }));
        assert_eq!(account.loan_balance.value(), dec!(100000));
    }

    #[test]
    fn oversized_loan_is_refused_not_added() {
        let mut account = test_account();
        account.draw_loan(Quote::new(dec!(90000))).unwrap();

        let err = account.draw_loan(Quote::new(Decimal::MAX)).unwrap_err();
        assert_eq!(
            err,
            AccountError::LoanLimitExceeded {
                current: Quote::new(dec!(90000)),
                limit: Quote::new(dec!(100000)),
                requested: Quote::new(Decimal::MAX),
            }
        );
        assert_eq!(account.loan_balance.value(), dec!(90000));
        assert_eq!(account.cash_balance.value(), dec!(91000));
    }

    #[test]
    fn credit_past_decimal_range_is_refused() {
        let mut account = test_account().with_cash(Quote::new(Decimal::MAX));
        let err = account.credit(Quote::new(dec!(1))).unwrap_err();
        assert!(matches!(err, AccountError::BalanceOverflow { .. }));
        assert_eq!(account.cash_balance.value(), Decimal::MAX);

        // loan within the ceiling but cash is full: nothing changes
        assert!(account.draw_loan(Quote::new(dec!(10))).is_err());
        assert_eq!(account.loan_balance, Quote::zero());
    }

    #[test]
    fn lots_are_not_merged() {
        let mut account = test_account();
        account.holdings.push(lot(7, 5));
        account.holdings.push(lot(7, 20));
        assert_eq!(account.holdings.len(), 2);
        assert_eq!(account.shares_of(InstrumentId(7)), 25);
    }

    #[test]
    fn reduce_matches_first_lot_only() {
        let mut account = test_account();
        account.holdings.push(lot(7, 5));
        account.holdings.push(lot(7, 20));

        // 25 shares held in total, but the first lot only has 5
        let err = account.reduce_first_lot(InstrumentId(7), 10).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientHoldings { instrument_id: InstrumentId(7), requested: 10, held: 5 }
        );
    }

    #[test]
    fn reduce_removes_exhausted_lot() {
        let mut account = test_account();
        account.holdings.push(lot(3, 4));
        account.holdings.push(lot(7, 5));
        account.holdings.push(lot(7, 20));

        let reduction = account.reduce_first_lot(InstrumentId(7), 5).unwrap();
        assert!(matches!(reduction, LotReduction::Removed { index: 1, .. }));
        assert_eq!(account.holdings.len(), 2);
        assert_eq!(account.holdings[1].quantity, 20);
    }

    #[test]
    fn undo_restores_lot_order() {
        let mut account = test_account();
        account.holdings.push(lot(3, 4));
        account.holdings.push(lot(7, 5));
        let before = account.holdings.clone();

        let removed = account.reduce_first_lot(InstrumentId(7), 5).unwrap();
        account.undo_reduction(removed);
        assert_eq!(account.holdings, before);

        let reduced = account.reduce_first_lot(InstrumentId(3), 1).unwrap();
        account.undo_reduction(reduced);
        assert_eq!(account.holdings, before);
    }

    #[test]
    fn reduce_without_lot() {
        let mut account = test_account();
        let err = account.reduce_first_lot(InstrumentId(9), 1).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientHoldings { held: 0, .. }));
    }
}
