// 8.0 engine/core.rs: main engine. owns the stores, the ledger, the journal,
// and the injected collaborators (persistence, clock, price drift).

use super::config::EngineConfig;
use super::results::TradeError;
use crate::account::Account;
use crate::clock::{Clock, SystemClock};
use crate::events::{AccountOpenedEvent, Event, EventJournal, EventPayload, InstrumentListedEvent};
use crate::instrument::{Instrument, HISTORY_CAP};
use crate::persistence::{NoopPersistence, Persistence};
use crate::price_feed::{PriceDrift, RandomDrift};
use crate::store::{AccountStore, MarketDataStore};
use crate::transaction::{Transaction, TransactionFilter, TransactionLog};
use crate::types::{AccountId, InstrumentId, Price, Quantity, Quote, Timestamp};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/** 8.1: main engine struct. shared behind an Arc; every method takes &self */
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) accounts: AccountStore,
    pub(super) market: MarketDataStore,
    pub(super) ledger: TransactionLog,
    pub(super) journal: EventJournal,
    pub(super) persistence: Arc<dyn Persistence>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) drift: Arc<dyn PriceDrift>,
    pub(super) tick_guard: Mutex<()>,
    next_account_id: AtomicU64,
    next_instrument_id: AtomicU64,
}

impl Engine {
    /// The history cap is pinned into `1..=HISTORY_CAP` whatever the config says.
    pub fn new(mut config: EngineConfig) -> Self {
        config.history_cap = config.history_cap.clamp(1, HISTORY_CAP);
        let journal = EventJournal::new(config.max_events);
        Self {
            config,
            accounts: AccountStore::new(),
            market: MarketDataStore::new(),
            ledger: TransactionLog::new(),
            journal,
            persistence: Arc::new(NoopPersistence),
            clock: Arc::new(SystemClock),
            drift: Arc::new(RandomDrift::new()),
            tick_guard: Mutex::new(()),
            next_account_id: AtomicU64::new(1),
            next_instrument_id: AtomicU64::new(1),
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_drift(mut self, drift: Arc<dyn PriceDrift>) -> Self {
        self.drift = drift;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn open_account(&self, name: &str, initial_cash: Quote) -> Result<AccountId, TradeError> {
        if initial_cash.is_negative() {
            return Err(TradeError::validation(format!("initial cash {initial_cash} is negative")));
        }
        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::SeqCst));
        let account = Account::new(id, name, self.config.default_loan_limit).with_cash(initial_cash);

        self.persistence.put_account(&account)?;
        self.accounts.insert(id, account);

        self.emit_event(EventPayload::AccountOpened(AccountOpenedEvent { account_id: id, initial_cash }));
        info!(account = %id, name, cash = %initial_cash, "account opened");
        Ok(id)
    }

    /// List a new instrument. Names are unique and prices must sit in [1, 100].
    pub fn register_instrument(
        &self,
        name: &str,
        quantity: Quantity,
        price: Decimal,
    ) -> Result<InstrumentId, TradeError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TradeError::validation("instrument name is empty"));
        }
        let price = Price::new(price)
            .ok_or_else(|| TradeError::validation(format!("price {price} outside [{}, {}]", Price::MIN, Price::MAX)))?;
        if self.market.id_by_name(name).is_some() {
            return Err(TradeError::validation(format!("instrument {name} already listed")));
        }

        let id = InstrumentId(self.next_instrument_id.fetch_add(1, Ordering::SeqCst));
        let instrument = Instrument::new(id, name, quantity, price);
        self.persistence.put_instrument(&instrument)?;
        if !self.market.insert(instrument) {
            return Err(TradeError::validation(format!("instrument {name} already listed")));
        }

        self.emit_event(EventPayload::InstrumentListed(InstrumentListedEvent {
            instrument_id: id,
            name: name.to_string(),
            quantity,
            price,
        }));
        info!(instrument = %id, name, quantity, price = %price, "instrument listed");
        Ok(id)
    }

    /// Hydrate an account read back from the durable store.
    pub fn load_account(&self, account: Account) {
        self.next_account_id.fetch_max(account.id.0 + 1, Ordering::SeqCst);
        self.accounts.insert(account.id, account);
    }

    /// Hydrate an instrument read back from the durable store.
    pub fn load_instrument(&self, instrument: Instrument) -> bool {
        self.next_instrument_id.fetch_max(instrument.id.0 + 1, Ordering::SeqCst);
        self.market.insert(instrument)
    }

    pub fn account(&self, account_id: AccountId) -> Option<Account> {
        self.accounts.snapshot(account_id)
    }

    pub fn instrument(&self, instrument_id: InstrumentId) -> Option<Instrument> {
        self.market.snapshot(instrument_id)
    }

    pub fn instrument_by_name(&self, name: &str) -> Option<Instrument> {
        self.market.id_by_name(name).and_then(|id| self.market.snapshot(id))
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        self.accounts.ids()
    }

    pub fn instrument_ids(&self) -> Vec<InstrumentId> {
        self.market.ids()
    }

    pub fn transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.ledger.query(filter)
    }

    pub fn transaction_count(&self) -> usize {
        self.ledger.len()
    }

    pub fn recent_events(&self, count: usize) -> Vec<Event> {
        self.journal.recent(count)
    }

    pub(super) fn emit_event(&self, payload: EventPayload) {
        self.journal.emit(self.clock.now(), payload);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("accounts", &self.accounts.len())
            .field("instruments", &self.market.len())
            .field("transactions", &self.ledger.len())
            .finish()
    }
}
