//! Eligibility enforcement and portfolio reads.

use super::core::Engine;
use super::results::TradeError;
use crate::account::Account;
use crate::events::{DisableReason, EventPayload, TradingDisabledEvent};
use crate::types::{AccountId, Quote};
use crate::valuation::{self, PortfolioSummary};
use tracing::warn;

impl Engine {
    /// Re-derive eligibility from current prices. Turns trading off (and
    /// persists that) when the portfolio is negative or cash is exhausted.
    pub fn check_trading_eligibility(&self, account_id: AccountId) -> Result<bool, TradeError> {
        let cell = self
            .accounts
            .get(account_id)
            .ok_or(TradeError::AccountNotFound(account_id))?;
        let mut account = cell.lock();
        self.enforce_eligibility(&mut account)
    }

    /// Caller holds the account lock. Takes instrument locks one at a time.
    pub(super) fn enforce_eligibility(&self, account: &mut Account) -> Result<bool, TradeError> {
        if valuation::is_eligible(account, &self.market) {
            return Ok(true);
        }
        if account.trading_enabled {
            let value = valuation::portfolio_value(account, &self.market);
            self.disable_trading(account, value)?;
        }
        Ok(false)
    }

    /// Flip the flag and persist the whole account. Reverts the flag if the write fails.
    pub(super) fn disable_trading(&self, account: &mut Account, portfolio_value: Quote) -> Result<(), TradeError> {
        account.trading_enabled = false;
        if let Err(e) = self.persistence.put_account(account) {
            account.trading_enabled = true;
            warn!(account = %account.id, error = %e, "could not persist trading stop");
            return Err(e.into());
        }

        let reason = if portfolio_value.is_negative() {
            DisableReason::NegativePortfolio
        } else {
            DisableReason::NoCash
        };
        warn!(
            account = %account.id,
            cash = %account.cash_balance,
            portfolio = %portfolio_value,
            ?reason,
            "trading stopped"
        );
        self.emit_event(EventPayload::TradingDisabled(TradingDisabledEvent {
            account_id: account.id,
            cash_balance: account.cash_balance,
            portfolio_value,
            reason,
        }));
        Ok(())
    }

    pub fn portfolio_value(&self, account_id: AccountId) -> Result<Quote, TradeError> {
        let account = self.account(account_id).ok_or(TradeError::AccountNotFound(account_id))?;
        Ok(valuation::portfolio_value(&account, &self.market))
    }

    pub fn profit_loss(&self, account_id: AccountId) -> Result<Quote, TradeError> {
        let account = self.account(account_id).ok_or(TradeError::AccountNotFound(account_id))?;
        Ok(valuation::profit_loss(&account, &self.market))
    }

    /// Snapshot read; holds no lock while pricing the lots.
    pub fn portfolio_summary(&self, account_id: AccountId) -> Result<PortfolioSummary, TradeError> {
        let account = self.account(account_id).ok_or(TradeError::AccountNotFound(account_id))?;
        Ok(valuation::summarize(&account, &self.market))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Engine, EngineConfig, TradeError};
    use crate::events::EventPayload;
    use crate::persistence::MemoryPersistence;
    use crate::types::{AccountId, Quote};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn eligibility_is_idempotent() {
        let engine = Engine::new(EngineConfig::default());
        let id = engine.open_account("broke", Quote::zero()).unwrap();

        let first = engine.check_trading_eligibility(id).unwrap();
        let second = engine.check_trading_eligibility(id).unwrap();
        assert!(!first);
        assert_eq!(first, second);

        let disabled = engine
            .recent_events(10)
            .into_iter()
            .filter(|e| matches!(e.payload, EventPayload::TradingDisabled(_)))
            .count();
        assert_eq!(disabled, 1);
    }

    #[test]
    fn funded_account_stays_enabled() {
        let engine = Engine::new(EngineConfig::default());
        let id = engine.open_account("funded", Quote::new(dec!(10))).unwrap();
        assert!(engine.check_trading_eligibility(id).unwrap());
        assert!(engine.check_trading_eligibility(id).unwrap());
        assert!(engine.account(id).unwrap().trading_enabled);
    }

    #[test]
    fn failed_persist_leaves_flag_untouched() {
        let store = Arc::new(MemoryPersistence::new());
        let engine = Engine::new(EngineConfig::default()).with_persistence(store.clone());
        let id = engine.open_account("broke", Quote::zero()).unwrap();

        store.set_offline(true);
        let err = engine.check_trading_eligibility(id).unwrap_err();
        assert!(matches!(err, TradeError::TransientStoreFailure(_)));
        assert!(engine.account(id).unwrap().trading_enabled);
    }

    #[test]
    fn unknown_account() {
        let engine = Engine::new(EngineConfig::default());
        assert_eq!(
            engine.check_trading_eligibility(AccountId(77)).unwrap_err(),
            TradeError::AccountNotFound(AccountId(77))
        );
    }
}
