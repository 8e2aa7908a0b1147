// stockex-core: simulated stock exchange trading engine.
// prices drift on a schedule, accounts buy and sell against instrument
// inventory, draw loans, and lose trading rights when cash runs out.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, InstrumentId, Price, Quote, Timestamp
//   2.x  account.rs: account, stock lots, loan ceiling
//   3.x  instrument.rs: instrument, bounded price history, performance windows
//   4.x  transaction.rs: immutable trade records + append-only log
//   5.x  valuation.rs: portfolio value, profit/loss, eligibility rule
//   6.x  store.rs: per-entity locked stores
//   7.x  config.rs: engine, scheduler, activity settings, env overrides
//   8.x  engine/: orders, credit, valuation checks, price tick
//   9.x  price_feed.rs: random drift source for the tick
//   9.1  clock.rs: injectable time source
//   9.2  persistence.rs: durable store boundary (mocked)
//   9.3  scheduler.rs: periodic tick driver on tokio
//   9.4  activity.rs: random trade generator
//   10.x logging.rs: tracing subscriber setup
//   11.x events.rs: state transition events for audit

// core trading modules
pub mod account;
pub mod engine;
pub mod events;
pub mod instrument;
pub mod transaction;
pub mod types;
pub mod valuation;

// shared state and collaborators
pub mod clock;
pub mod persistence;
pub mod price_feed;
pub mod store;

// runtime and integration modules
pub mod activity;
pub mod config;
pub mod logging;
pub mod scheduler;

// re exports for convenience
pub use account::{Account, AccountError, Position};
pub use activity::{ActivitySummary, MarketActivity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ActivityConfig, ConfigError, Environment, ExchangeConfig, SchedulerConfig};
pub use engine::*;
pub use events::*;
pub use instrument::{Instrument, Performance, PricePoint, HISTORY_CAP};
pub use persistence::{MemoryPersistence, NoopPersistence, Persistence, StoreError, WriteBatch};
pub use price_feed::{FixedDrift, PriceDrift, RandomDrift, ScriptedDrift};
pub use scheduler::{PriceScheduler, SchedulerHandle};
pub use transaction::{Transaction, TransactionFilter, TransactionLog};
pub use types::*;
pub use valuation::{PortfolioSummary, PositionValuation};
