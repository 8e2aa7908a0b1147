// 4.0: the audit trail. one immutable record per filled order, append only.

use crate::types::{AccountId, InstrumentId, Price, Quantity, Quote, Timestamp, TradeSide, TransactionId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub side: TradeSide,
    pub quantity: Quantity,
    pub price: Price,
    pub total_amount: Quote,
    pub timestamp: Timestamp,
}

/// Lookup criteria. Unset fields match everything; the time range is inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    pub instrument_id: Option<InstrumentId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl TransactionFilter {
    pub fn account(account_id: AccountId) -> Self {
        Self { account_id: Some(account_id), ..Self::default() }
    }

    pub fn instrument(instrument_id: InstrumentId) -> Self {
        Self { instrument_id: Some(instrument_id), ..Self::default() }
    }

    pub fn between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.account_id.map_or(true, |id| tx.account_id == id)
            && self.instrument_id.map_or(true, |id| tx.instrument_id == id)
            && self.from.map_or(true, |from| tx.timestamp >= from)
            && self.to.map_or(true, |to| tx.timestamp <= to)
    }
}

/// In-process transaction log. Readers get cloned snapshots.
#[derive(Debug)]
pub struct TransactionLog {
    records: RwLock<Vec<Transaction>>,
    next_id: AtomicU64,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLog {
    pub fn new() -> Self {
        Self { records: RwLock::new(Vec::new()), next_id: AtomicU64::new(1) }
    }

    pub fn next_id(&self) -> TransactionId {
        TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn append(&self, tx: Transaction) {
        self.records.write().push(tx);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn query(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.records.read().iter().filter(|tx| filter.matches(tx)).cloned().collect()
    }

    pub fn all(&self) -> Vec<Transaction> {
        self.records.read().clone()
    }
}
