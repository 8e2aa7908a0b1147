//! In-memory entity stores.
//!
//! Each entity lives in its own `Arc<Mutex<_>>` cell. The map lock is held
//! only long enough to find or insert a cell, so work on disjoint accounts
//! or instruments never contends. Lock order everywhere in the crate is
//! account cell before instrument cell.

use crate::account::Account;
use crate::instrument::Instrument;
use crate::types::{AccountId, InstrumentId, Price};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub type Cell<T> = Arc<Mutex<T>>;

#[derive(Debug)]
pub struct EntityStore<K, V> {
    cells: RwLock<BTreeMap<K, Cell<V>>>,
}

impl<K: Ord + Copy, V: Clone> EntityStore<K, V> {
    pub fn new() -> Self {
        Self { cells: RwLock::new(BTreeMap::new()) }
    }

    pub fn insert(&self, id: K, value: V) -> Cell<V> {
        let cell = Arc::new(Mutex::new(value));
        self.cells.write().insert(id, Arc::clone(&cell));
        cell
    }

    pub fn get(&self, id: K) -> Option<Cell<V>> {
        self.cells.read().get(&id).cloned()
    }

    pub fn contains(&self, id: K) -> bool {
        self.cells.read().contains_key(&id)
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<K> {
        self.cells.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.read().is_empty()
    }

    /// Point-in-time copy of one entity.
    pub fn snapshot(&self, id: K) -> Option<V> {
        self.get(id).map(|cell| cell.lock().clone())
    }

    /// Copies taken one cell at a time; not a consistent cut across entities.
    pub fn snapshots(&self) -> Vec<V> {
        let cells: Vec<Cell<V>> = self.cells.read().values().cloned().collect();
        cells.iter().map(|cell| cell.lock().clone()).collect()
    }
}

impl<K: Ord + Copy, V: Clone> Default for EntityStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type AccountStore = EntityStore<AccountId, Account>;

/// Instruments plus a unique-name index.
#[derive(Debug, Default)]
pub struct MarketDataStore {
    instruments: EntityStore<InstrumentId, Instrument>,
    names: RwLock<HashMap<String, InstrumentId>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` without inserting if the name is already listed.
    pub fn insert(&self, instrument: Instrument) -> bool {
        let mut names = self.names.write();
        if names.contains_key(&instrument.name) {
            return false;
        }
        names.insert(instrument.name.clone(), instrument.id);
        self.instruments.insert(instrument.id, instrument);
        true
    }

    pub fn get(&self, id: InstrumentId) -> Option<Cell<Instrument>> {
        self.instruments.get(id)
    }

    pub fn id_by_name(&self, name: &str) -> Option<InstrumentId> {
        self.names.read().get(name).copied()
    }

    pub fn ids(&self) -> Vec<InstrumentId> {
        self.instruments.ids()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn snapshot(&self, id: InstrumentId) -> Option<Instrument> {
        self.instruments.snapshot(id)
    }

    pub fn snapshots(&self) -> Vec<Instrument> {
        self.instruments.snapshots()
    }

    /// Current price, taking the instrument lock only for the read.
    pub fn price_of(&self, id: InstrumentId) -> Option<Price> {
        self.get(id).map(|cell| cell.lock().current_price)
    }
}
