//! Engine configuration options.

use crate::instrument::HISTORY_CAP;
use crate::types::Quote;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Price points kept per instrument.
    pub history_cap: usize,
    /// Loan ceiling given to newly opened accounts.
    pub default_loan_limit: Quote,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            history_cap: HISTORY_CAP,
            default_loan_limit: Quote::new(dec!(100000)),
        }
    }
}
