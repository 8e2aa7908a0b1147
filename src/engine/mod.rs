// 8.0: trading engine. order execution, credit, valuation and the price tick,
// each an `impl Engine` block over shared stores with one lock per entity.
// lock order everywhere: account before instrument.

mod config;
mod core;
mod credit;
mod orders;
mod pricing;
mod results;
mod valuation;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{ErrorKind, LoanReceipt, OrderReceipt, TickFailure, TickReport, TradeError};
