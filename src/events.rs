// 11.0: every state change produces an event. fills, rejections, loans, price moves,
// accounts losing trading rights. the journal keeps the most recent ones in memory.

use crate::engine::ErrorKind;
use crate::types::{AccountId, InstrumentId, Price, Quantity, Quote, Timestamp, TradeSide, TransactionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Setup
    AccountOpened(AccountOpenedEvent),
    InstrumentListed(InstrumentListedEvent),

    // Orders
    OrderFilled(OrderFilledEvent),
    OrderRejected(OrderRejectedEvent),

    // Credit
    LoanGranted(LoanGrantedEvent),

    // Market
    PriceUpdated(PriceUpdatedEvent),
    TradingDisabled(TradingDisabledEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOpenedEvent {
    pub account_id: AccountId,
    pub initial_cash: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentListedEvent {
    pub instrument_id: InstrumentId,
    pub name: String,
    pub quantity: Quantity,
    pub price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFilledEvent {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub side: TradeSide,
    pub quantity: Quantity,
    pub price: Price,
    pub new_cash_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejectedEvent {
    pub account_id: AccountId,
    pub instrument_id: InstrumentId,
    pub side: TradeSide,
    pub quantity: Quantity,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanGrantedEvent {
    pub account_id: AccountId,
    pub amount: Quote,
    pub loan_balance: Quote,
    pub available_credit: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    pub instrument_id: InstrumentId,
    pub old_price: Price,
    pub new_price: Price,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisableReason {
    NoCash,
    NegativePortfolio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingDisabledEvent {
    pub account_id: AccountId,
    pub cash_balance: Quote,
    pub portfolio_value: Quote,
    pub reason: DisableReason,
}

/// Bounded, shared event buffer. Oldest events drop first.
#[derive(Debug)]
pub struct EventJournal {
    inner: Mutex<JournalInner>,
    capacity: usize,
}

#[derive(Debug)]
struct JournalInner {
    events: VecDeque<Event>,
    next_id: u64,
}

impl EventJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(JournalInner { events: VecDeque::new(), next_id: 1 }),
            capacity,
        }
    }

    pub fn emit(&self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let mut inner = self.inner.lock();
        let id = EventId(inner.next_id);
        inner.next_id += 1;
        inner.events.push_back(Event { id, timestamp, payload });
        while inner.events.len() > self.capacity {
            inner.events.pop_front();
        }
        id
    }

    pub fn recent(&self, count: usize) -> Vec<Event> {
        let inner = self.inner.lock();
        let start = inner.events.len().saturating_sub(count);
        inner.events.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().events.is_empty()
    }
}
