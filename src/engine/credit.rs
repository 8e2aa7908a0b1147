//! Credit line. Loans only grow; proceeds land in cash.

use super::core::Engine;
use super::results::{LoanReceipt, TradeError};
use crate::events::{EventPayload, LoanGrantedEvent};
use crate::types::{AccountId, Quote};
use tracing::{info, warn};

impl Engine {
    /// Draw `amount` against the account's fixed loan ceiling.
    pub fn grant_loan(&self, account_id: AccountId, amount: Quote) -> Result<LoanReceipt, TradeError> {
        if !amount.is_positive() {
            return Err(TradeError::validation(format!("loan amount {amount} must be positive")));
        }
        let cell = self
            .accounts
            .get(account_id)
            .ok_or(TradeError::AccountNotFound(account_id))?;

        let receipt = {
            let mut account = cell.lock();
            if let Err(e) = account.draw_loan(amount) {
                let err = TradeError::from(e);
                warn!(account = %account_id, requested = %amount, error = %err, "loan refused");
                return Err(err);
            }
            if let Err(e) = self.persistence.put_account(&account) {
                account.loan_balance = account.loan_balance.sub(amount);
                account.debit(amount);
                warn!(account = %account_id, error = %e, "loan rolled back");
                return Err(e.into());
            }
            LoanReceipt {
                account_id,
                amount,
                cash_balance: account.cash_balance,
                loan_balance: account.loan_balance,
                available_credit: account.available_credit(),
            }
        };

        info!(
            account = %account_id,
            amount = %amount,
            loan_balance = %receipt.loan_balance,
            available = %receipt.available_credit,
            "loan granted"
        );
        self.emit_event(EventPayload::LoanGranted(LoanGrantedEvent {
            account_id,
            amount,
            loan_balance: receipt.loan_balance,
            available_credit: receipt.available_credit,
        }));
        Ok(receipt)
    }
}
