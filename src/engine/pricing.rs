//! Price tick.
//!
//! Phase one walks the instruments, phase two walks the accounts. Only one
//! entity lock is held at a time (plus short instrument reads during
//! revaluation), and every instrument write of a tick lands before any
//! account of that tick is revalued.

use super::core::Engine;
use super::results::{TickFailure, TickReport, TradeError};
use crate::events::{EventPayload, PriceUpdatedEvent};
use crate::instrument::next_price;
use crate::persistence::StoreError;
use crate::types::{AccountId, InstrumentId, Timestamp};
use crate::valuation;
use tracing::{debug, info, warn};

enum Revaluation {
    Inactive,
    Revalued,
    Disabled,
}

impl Engine {
    /// Run one price simulation cycle. If another tick is still running this
    /// returns immediately with `skipped` set.
    pub fn tick(&self) -> TickReport {
        let started_at = self.clock.now();
        let Some(_running) = self.tick_guard.try_lock() else {
            debug!("previous tick still running, skipping");
            return TickReport::skipped(started_at);
        };
        let mut report = TickReport::new(started_at);

        for instrument_id in self.market.ids() {
            match self.advance_instrument(instrument_id, started_at) {
                Ok(true) => report.instruments_updated += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(instrument = %instrument_id, %error, "price update failed, continuing");
                    report.failures.push(TickFailure::Instrument { instrument_id, error });
                }
            }
        }

        for account_id in self.accounts.ids() {
            match self.revalue_account(account_id) {
                Ok(Revaluation::Inactive) => {}
                Ok(Revaluation::Revalued) => report.accounts_revalued += 1,
                Ok(Revaluation::Disabled) => {
                    report.accounts_revalued += 1;
                    report.accounts_disabled.push(account_id);
                }
                Err(error) => {
                    warn!(account = %account_id, %error, "revaluation failed, continuing");
                    report.failures.push(TickFailure::Account { account_id, error });
                }
            }
        }

        info!(
            instruments = report.instruments_updated,
            accounts = report.accounts_revalued,
            disabled = report.accounts_disabled.len(),
            failures = report.failures.len(),
            at = %started_at,
            "prices updated"
        );
        report
    }

    fn advance_instrument(&self, instrument_id: InstrumentId, now: Timestamp) -> Result<bool, StoreError> {
        let Some(cell) = self.market.get(instrument_id) else {
            return Ok(false);
        };
        let (old_price, new_price) = {
            let mut instrument = cell.lock();
            let old_price = instrument.current_price;
            let new_price = next_price(old_price, self.drift.next_change(instrument_id));
            let undo = instrument.apply_price(new_price, now, self.config.history_cap);
            if let Err(e) = self.persistence.put_instrument(&instrument) {
                instrument.revert_price(undo);
                return Err(e);
            }
            (old_price, new_price)
        };

        debug!(instrument = %instrument_id, old = %old_price, new = %new_price, "price moved");
        self.emit_event(EventPayload::PriceUpdated(PriceUpdatedEvent {
            instrument_id,
            old_price,
            new_price,
        }));
        Ok(true)
    }

    // refresh cached profit/loss, then apply the same eligibility rule buy uses
    fn revalue_account(&self, account_id: AccountId) -> Result<Revaluation, TradeError> {
        let Some(cell) = self.accounts.get(account_id) else {
            return Ok(Revaluation::Inactive);
        };
        let mut account = cell.lock();
        if !account.trading_enabled {
            return Ok(Revaluation::Inactive);
        }

        let previous = account.profit_loss;
        let portfolio_value = valuation::portfolio_value(&account, &self.market);
        account.profit_loss = portfolio_value.sub(account.loan_balance);

        if valuation::is_eligible(&account, &self.market) {
            if let Err(e) = self.persistence.put_account(&account) {
                account.profit_loss = previous;
                return Err(e.into());
            }
            return Ok(Revaluation::Revalued);
        }

        if let Err(e) = self.disable_trading(&mut account, portfolio_value) {
            account.profit_loss = previous;
            return Err(e);
        }
        Ok(Revaluation::Disabled)
    }
}
