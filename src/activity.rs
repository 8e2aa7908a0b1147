//! Market activity generator.
//!
//! Fires a batch of random orders at the engine: random account, random
//! instrument, coin-flip side, quantity in `1..=max_quantity`. A sell the
//! account cannot cover from its first lot is sent as a buy instead.

use crate::config::ActivityConfig;
use crate::engine::{Engine, ErrorKind};
use crate::transaction::Transaction;
use crate::types::{AccountId, InstrumentId, Quantity, TradeSide};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ActivitySummary {
    pub attempted: usize,
    pub fills: Vec<Transaction>,
    /// Sells that became buys because the holdings did not cover them.
    pub converted: usize,
    pub rejections: HashMap<ErrorKind, usize>,
}

impl ActivitySummary {
    pub fn filled(&self) -> usize {
        self.fills.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

pub struct MarketActivity {
    config: ActivityConfig,
    rng: Mutex<StdRng>,
}

impl MarketActivity {
    pub fn new(config: ActivityConfig) -> Self {
        Self { config, rng: Mutex::new(StdRng::from_os_rng()) }
    }

    pub fn with_seed(config: ActivityConfig, seed: u64) -> Self {
        Self { config, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Run one batch. With no accounts or no instruments nothing is attempted.
    pub fn run(&self, engine: &Engine) -> ActivitySummary {
        let accounts = engine.account_ids();
        let instruments = engine.instrument_ids();
        let mut summary = ActivitySummary::default();
        if accounts.is_empty() || instruments.is_empty() {
            return summary;
        }

        for _ in 0..self.config.trades_per_run {
            let (account_id, instrument_id, side, quantity) = self.draw(&accounts, &instruments);
            summary.attempted += 1;

            let side = if side == TradeSide::Sell && !covers(engine, account_id, instrument_id, quantity) {
                summary.converted += 1;
                TradeSide::Buy
            } else {
                side
            };

            let result = match side {
                TradeSide::Buy => engine.buy(account_id, instrument_id, quantity),
                TradeSide::Sell => engine.sell(account_id, instrument_id, quantity),
            };
            match result {
                Ok(receipt) => summary.fills.push(receipt.transaction),
                Err(e) => {
                    debug!(account = %account_id, instrument = %instrument_id, %side, error = %e, "random trade rejected");
                    *summary.rejections.entry(e.kind()).or_insert(0) += 1;
                }
            }
        }

        info!(
            attempted = summary.attempted,
            filled = summary.filled(),
            converted = summary.converted,
            rejected = summary.rejected(),
            "market activity batch done"
        );
        summary
    }

    fn draw(&self, accounts: &[AccountId], instruments: &[InstrumentId]) -> (AccountId, InstrumentId, TradeSide, Quantity) {
        let mut rng = self.rng.lock();
        let account_id = accounts[rng.random_range(0..accounts.len())];
        let instrument_id = instruments[rng.random_range(0..instruments.len())];
        let side = if rng.random_bool(0.5) { TradeSide::Buy } else { TradeSide::Sell };
        let quantity = rng.random_range(1..=self.config.max_quantity.max(1));
        (account_id, instrument_id, side, quantity)
    }
}

// same first-lot rule the sell path applies
fn covers(engine: &Engine, account_id: AccountId, instrument_id: InstrumentId, quantity: Quantity) -> bool {
    engine
        .account(account_id)
        .and_then(|account| account.first_lot(instrument_id).map(|(_, lot)| lot.quantity >= quantity))
        .unwrap_or(false)
}
