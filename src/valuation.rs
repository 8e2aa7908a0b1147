// 5.0: portfolio valuation. pure math over an account and a price lookup.
// no randomness, no clock: the same inputs always give the same verdict.

use crate::account::{Account, Position};
use crate::store::MarketDataStore;
use crate::types::{AccountId, InstrumentId, Price, Quantity, Quote};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub trait PriceLookup {
    fn price_of(&self, instrument_id: InstrumentId) -> Option<Price>;
}

impl PriceLookup for MarketDataStore {
    fn price_of(&self, instrument_id: InstrumentId) -> Option<Price> {
        MarketDataStore::price_of(self, instrument_id)
    }
}

impl PriceLookup for HashMap<InstrumentId, Price> {
    fn price_of(&self, instrument_id: InstrumentId) -> Option<Price> {
        self.get(&instrument_id).copied()
    }
}

/// Market value of one lot. `None` when the instrument has no price.
pub fn position_value(position: &Position, prices: &impl PriceLookup) -> Option<Quote> {
    prices
        .price_of(position.instrument_id)
        .map(|price| price.times(position.quantity))
}

/// Cash plus every lot at its current price. Lots without a price add nothing.
pub fn portfolio_value(account: &Account, prices: &impl PriceLookup) -> Quote {
    let holdings: Quote = account
        .holdings
        .iter()
        .filter_map(|lot| position_value(lot, prices))
        .sum();
    account.cash_balance.saturating_add(holdings)
}

/// Portfolio value net of borrowed money.
pub fn profit_loss(account: &Account, prices: &impl PriceLookup) -> Quote {
    portfolio_value(account, prices).sub(account.loan_balance)
}

/// Verdict only; the caller decides what to do with the flag.
pub fn is_eligible(account: &Account, prices: &impl PriceLookup) -> bool {
    let value = portfolio_value(account, prices);
    !value.is_negative() && account.cash_balance.is_positive()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    pub instrument_id: InstrumentId,
    pub quantity: Quantity,
    pub purchase_price: Price,
    pub current_price: Option<Price>,
    pub current_value: Quote,
    pub total_investment: Quote,
    pub profit_loss: Quote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub account_id: AccountId,
    pub cash_balance: Quote,
    pub loan_balance: Quote,
    pub portfolio_value: Quote,
    pub profit_loss: Quote,
    pub trading_enabled: bool,
    pub positions: Vec<PositionValuation>,
}

pub fn value_position(position: &Position, prices: &impl PriceLookup) -> PositionValuation {
    let current_price = prices.price_of(position.instrument_id);
    let current_value = current_price
        .map(|p| p.times(position.quantity))
        .unwrap_or_else(Quote::zero);
    PositionValuation {
        instrument_id: position.instrument_id,
        quantity: position.quantity,
        purchase_price: position.purchase_price,
        current_price,
        current_value,
        total_investment: position.total_investment,
        profit_loss: current_value.sub(position.total_investment),
    }
}

pub fn summarize(account: &Account, prices: &impl PriceLookup) -> PortfolioSummary {
    let positions: Vec<PositionValuation> =
        account.holdings.iter().map(|lot| value_position(lot, prices)).collect();
    let holdings_value: Quote = positions.iter().map(|p| p.current_value).sum();
    let portfolio_value = account.cash_balance.saturating_add(holdings_value);

    PortfolioSummary {
        account_id: account.id,
        cash_balance: account.cash_balance,
        loan_balance: account.loan_balance,
        portfolio_value,
        profit_loss: portfolio_value.sub(account.loan_balance),
        trading_enabled: account.trading_enabled,
        positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prices(pairs: &[(u64, rust_decimal::Decimal)]) -> HashMap<InstrumentId, Price> {
        pairs
            .iter()
            .map(|(id, p)| (InstrumentId(*id), Price::new_unchecked(*p)))
            .collect()
    }

    fn account_with_lots() -> Account {
        let mut account =
            Account::new(AccountId(1), "alice", Quote::new(dec!(100000))).with_cash(Quote::new(dec!(500)));
        account.loan_balance = Quote::new(dec!(200));
        account.holdings.push(Position::open(InstrumentId(1), 10, Price::new_unchecked(dec!(50))));
        account.holdings.push(Position::open(InstrumentId(2), 4, Price::new_unchecked(dec!(20))));
        account
    }

    #[test]
    fn value_uses_current_prices() {
        let account = account_with_lots();
        let p = prices(&[(1, dec!(55)), (2, dec!(10))]);
        // 500 + 10*55 + 4*10
        assert_eq!(portfolio_value(&account, &p).value(), dec!(1090));
        assert_eq!(profit_loss(&account, &p).value(), dec!(890));
    }

    #[test]
    fn unknown_instrument_contributes_nothing() {
        let account = account_with_lots();
        let p = prices(&[(1, dec!(50))]);
        assert_eq!(portfolio_value(&account, &p).value(), dec!(1000));
    }

    #[test]
    fn position_profit_loss() {
        let account = account_with_lots();
        let p = prices(&[(1, dec!(45)), (2, dec!(25))]);
        let summary = summarize(&account, &p);
        assert_eq!(summary.positions[0].profit_loss.value(), dec!(-50));
        assert_eq!(summary.positions[1].profit_loss.value(), dec!(20));
        assert_eq!(summary.portfolio_value, portfolio_value(&account, &p));
        assert_eq!(summary.profit_loss, profit_loss(&account, &p));
    }

    #[test]
    fn zero_cash_is_ineligible() {
        let mut account = account_with_lots();
        let p = prices(&[(1, dec!(50)), (2, dec!(20))]);
        assert!(is_eligible(&account, &p));

        account.cash_balance = Quote::zero();
        assert!(!is_eligible(&account, &p));
    }

    #[test]
    fn negative_value_is_ineligible() {
        let mut account = account_with_lots();
        account.holdings.clear();
        account.cash_balance = Quote::new(dec!(-1));
        assert!(!is_eligible(&account, &HashMap::new()));
    }
}
