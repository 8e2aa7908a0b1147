//! Order execution.
//!
//! Both sides lock the account, then the instrument, validate, mutate in
//! place, and write the batch through. A failed write undoes the in-memory
//! mutations before either lock is released, so no reader ever observes a
//! half-applied order.

use super::core::Engine;
use super::results::{OrderReceipt, TradeError};
use crate::account::{Account, Position};
use crate::events::{EventPayload, OrderFilledEvent, OrderRejectedEvent};
use crate::persistence::WriteBatch;
use crate::transaction::Transaction;
use crate::types::{AccountId, InstrumentId, Price, Quantity, Quote, TradeSide};
use crate::valuation;
use tracing::{info, warn};

impl Engine {
    /// Buy `quantity` shares at the instrument's current price. Opens a new lot.
    pub fn buy(
        &self,
        account_id: AccountId,
        instrument_id: InstrumentId,
        quantity: Quantity,
    ) -> Result<OrderReceipt, TradeError> {
        let result = self.execute_buy(account_id, instrument_id, quantity);
        self.record_outcome(account_id, instrument_id, TradeSide::Buy, quantity, &result);
        result
    }

    /// Sell `quantity` shares out of the first lot held for the instrument.
    pub fn sell(
        &self,
        account_id: AccountId,
        instrument_id: InstrumentId,
        quantity: Quantity,
    ) -> Result<OrderReceipt, TradeError> {
        let result = self.execute_sell(account_id, instrument_id, quantity);
        self.record_outcome(account_id, instrument_id, TradeSide::Sell, quantity, &result);
        result
    }

    fn execute_buy(
        &self,
        account_id: AccountId,
        instrument_id: InstrumentId,
        quantity: Quantity,
    ) -> Result<OrderReceipt, TradeError> {
        if quantity == 0 {
            return Err(TradeError::validation("quantity must be positive"));
        }
        let account_cell = self
            .accounts
            .get(account_id)
            .ok_or(TradeError::AccountNotFound(account_id))?;
        let instrument_cell = self
            .market
            .get(instrument_id)
            .ok_or(TradeError::InstrumentNotFound(instrument_id))?;

        let mut account = account_cell.lock();
        if !account.trading_enabled {
            return Err(ineligible(&account));
        }
        if !account.cash_balance.is_positive() {
            let required = self
                .market
                .price_of(instrument_id)
                .map(|price| price.times(quantity))
                .unwrap_or_default();
            let value = valuation::portfolio_value(&account, &self.market);
            self.disable_trading(&mut account, value)?;
            return Err(insufficient_funds(required, account.cash_balance));
        }
        // eligibility reads other instruments' prices, so it runs before the
        // target instrument is locked
        if !self.enforce_eligibility(&mut account)? {
            return Err(ineligible(&account));
        }

        let mut instrument = instrument_cell.lock();
        if quantity > instrument.available_quantity {
            return Err(TradeError::InsufficientInventory {
                instrument_id,
                requested: quantity,
                available: instrument.available_quantity,
            });
        }
        let price = instrument.current_price;
        let cost = price.times(quantity);
        if cost > account.cash_balance {
            return Err(insufficient_funds(cost, account.cash_balance));
        }

        let cash_before = account.cash_balance;
        account.debit(cost);
        account.holdings.push(Position::open(instrument_id, quantity, price));
        instrument.available_quantity -= quantity;

        let tx = self.new_transaction(account_id, instrument_id, TradeSide::Buy, quantity, price, cost);
        if let Err(e) = self.persistence.commit(&WriteBatch::order(&account, &instrument, &tx)) {
            instrument.available_quantity += quantity;
            account.holdings.pop();
            account.cash_balance = cash_before;
            warn!(account = %account_id, instrument = %instrument_id, error = %e, "buy rolled back");
            return Err(e.into());
        }
        self.ledger.append(tx.clone());

        Ok(OrderReceipt {
            transaction: tx,
            cash_balance: account.cash_balance,
            instrument_available: instrument.available_quantity,
        })
    }

    fn execute_sell(
        &self,
        account_id: AccountId,
        instrument_id: InstrumentId,
        quantity: Quantity,
    ) -> Result<OrderReceipt, TradeError> {
        if quantity == 0 {
            return Err(TradeError::validation("quantity must be positive"));
        }
        let account_cell = self
            .accounts
            .get(account_id)
            .ok_or(TradeError::AccountNotFound(account_id))?;
        let instrument_cell = self
            .market
            .get(instrument_id)
            .ok_or(TradeError::InstrumentNotFound(instrument_id))?;

        let mut account = account_cell.lock();
        let mut instrument = instrument_cell.lock();

        let reduction = account.reduce_first_lot(instrument_id, quantity)?;
        let price = instrument.current_price;
        let proceeds = price.times(quantity);
        if let Err(e) = account.credit(proceeds) {
            account.undo_reduction(reduction);
            return Err(e.into());
        }
        instrument.available_quantity += quantity;

        let tx = self.new_transaction(account_id, instrument_id, TradeSide::Sell, quantity, price, proceeds);
        if let Err(e) = self.persistence.commit(&WriteBatch::order(&account, &instrument, &tx)) {
            instrument.available_quantity -= quantity;
            account.debit(proceeds);
            account.undo_reduction(reduction);
            warn!(account = %account_id, instrument = %instrument_id, error = %e, "sell rolled back");
            return Err(e.into());
        }
        self.ledger.append(tx.clone());

        Ok(OrderReceipt {
            transaction: tx,
            cash_balance: account.cash_balance,
            instrument_available: instrument.available_quantity,
        })
    }

    fn new_transaction(
        &self,
        account_id: AccountId,
        instrument_id: InstrumentId,
        side: TradeSide,
        quantity: Quantity,
        price: Price,
        total_amount: Quote,
    ) -> Transaction {
        Transaction {
            id: self.ledger.next_id(),
            account_id,
            instrument_id,
            side,
            quantity,
            price,
            total_amount,
            timestamp: self.clock.now(),
        }
    }

    // runs after every lock is released
    fn record_outcome(
        &self,
        account_id: AccountId,
        instrument_id: InstrumentId,
        side: TradeSide,
        quantity: Quantity,
        result: &Result<OrderReceipt, TradeError>,
    ) {
        match result {
            Ok(receipt) => {
                let tx = &receipt.transaction;
                info!(
                    account = %account_id,
                    instrument = %instrument_id,
                    %side,
                    quantity,
                    price = %tx.price,
                    total = %tx.total_amount,
                    "order filled"
                );
                self.emit_event(EventPayload::OrderFilled(OrderFilledEvent {
                    transaction_id: tx.id,
                    account_id,
                    instrument_id,
                    side,
                    quantity,
                    price: tx.price,
                    new_cash_balance: receipt.cash_balance,
                }));
            }
            Err(e) => {
                warn!(account = %account_id, instrument = %instrument_id, %side, quantity, error = %e, "order rejected");
                self.emit_event(EventPayload::OrderRejected(OrderRejectedEvent {
                    account_id,
                    instrument_id,
                    side,
                    quantity,
                    kind: e.kind(),
                    reason: e.to_string(),
                }));
            }
        }
    }
}

fn ineligible(account: &Account) -> TradeError {
    TradeError::IneligibleAccount {
        account_id: account.id,
        cash_balance: account.cash_balance,
        loan_balance: account.loan_balance,
    }
}

fn insufficient_funds(required: Quote, available: Quote) -> TradeError {
    TradeError::InsufficientFunds {
        required,
        available,
        shortfall: required.sub(available),
    }
}
