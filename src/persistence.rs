//! Durable store seam.
//!
//! The engine keeps its working set in memory and writes through to a
//! [`Persistence`] implementation. A write either commits or fails as a whole;
//! on failure the engine reverts its in-memory change.

use crate::account::Account;
use crate::instrument::Instrument;
use crate::transaction::{Transaction, TransactionFilter};
use crate::types::{AccountId, InstrumentId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Records that must land together.
#[derive(Debug, Default)]
pub struct WriteBatch<'a> {
    pub accounts: Vec<&'a Account>,
    pub instruments: Vec<&'a Instrument>,
    pub transactions: Vec<&'a Transaction>,
}

impl<'a> WriteBatch<'a> {
    pub fn order(account: &'a Account, instrument: &'a Instrument, transaction: &'a Transaction) -> Self {
        Self {
            accounts: vec![account],
            instruments: vec![instrument],
            transactions: vec![transaction],
        }
    }
}

pub trait Persistence: Send + Sync {
    fn put_account(&self, account: &Account) -> Result<(), StoreError>;

    fn put_instrument(&self, instrument: &Instrument) -> Result<(), StoreError>;

    /// All-or-nothing write of several records.
    fn commit(&self, batch: &WriteBatch<'_>) -> Result<(), StoreError>;

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn get_instrument(&self, id: InstrumentId) -> Result<Option<Instrument>, StoreError>;

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;
}

/// Discards every write. For purely in-memory engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

impl Persistence for NoopPersistence {
    fn put_account(&self, _account: &Account) -> Result<(), StoreError> {
        Ok(())
    }

    fn put_instrument(&self, _instrument: &Instrument) -> Result<(), StoreError> {
        Ok(())
    }

    fn commit(&self, _batch: &WriteBatch<'_>) -> Result<(), StoreError> {
        Ok(())
    }

    fn get_account(&self, _id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(None)
    }

    fn get_instrument(&self, _id: InstrumentId) -> Result<Option<Instrument>, StoreError> {
        Ok(None)
    }

    fn transactions(&self, _filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    instruments: HashMap<InstrumentId, Instrument>,
    transactions: Vec<Transaction>,
}

/// Keeps copies of everything written. Can be switched offline to
/// simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    tables: Mutex<Tables>,
    offline: AtomicBool,
    writes: AtomicU64,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched offline".to_string()));
        }
        Ok(())
    }
}

impl Persistence for MemoryPersistence {
    fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        self.check_online()?;
        self.tables.lock().accounts.insert(account.id, account.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn put_instrument(&self, instrument: &Instrument) -> Result<(), StoreError> {
        self.check_online()?;
        self.tables.lock().instruments.insert(instrument.id, instrument.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self, batch: &WriteBatch<'_>) -> Result<(), StoreError> {
        self.check_online()?;
        let mut tables = self.tables.lock();
        for account in &batch.accounts {
            tables.accounts.insert(account.id, (*account).clone());
        }
        for instrument in &batch.instruments {
            tables.instruments.insert(instrument.id, (*instrument).clone());
        }
        tables.transactions.extend(batch.transactions.iter().map(|tx| (*tx).clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.check_online()?;
        Ok(self.tables.lock().accounts.get(&id).cloned())
    }

    fn get_instrument(&self, id: InstrumentId) -> Result<Option<Instrument>, StoreError> {
        self.check_online()?;
        Ok(self.tables.lock().instruments.get(&id).cloned())
    }

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        self.check_online()?;
        Ok(self.tables.lock().transactions.iter().filter(|tx| filter.matches(tx)).cloned().collect())
    }
}
