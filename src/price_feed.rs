// Price Feed
//
// Where a tick gets its price moves from. The engine only asks for a
// fractional change per instrument; whether that comes from a seeded RNG,
// a fixed value or a script is up to the feed.

use crate::types::InstrumentId;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// Largest move a single tick may draw, either direction (2%).
pub const MAX_TICK_CHANGE: Decimal = dec!(0.02);

// draws are taken in millionths so no float ever touches a price
const DRAW_SCALE: u32 = 6;
const DRAW_BOUND: i64 = 20_000;

pub trait PriceDrift: Send + Sync {
    /// Fractional change for one instrument, inside [-MAX_TICK_CHANGE, MAX_TICK_CHANGE].
    fn next_change(&self, instrument_id: InstrumentId) -> Decimal;
}

/// Uniform draw in [-2%, +2%].
pub struct RandomDrift {
    rng: Mutex<StdRng>,
}

impl RandomDrift {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_os_rng()) }
    }

    /// Reproducible sequence for replays and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for RandomDrift {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceDrift for RandomDrift {
    fn next_change(&self, _instrument_id: InstrumentId) -> Decimal {
        let millionths = self.rng.lock().random_range(-DRAW_BOUND..=DRAW_BOUND);
        Decimal::new(millionths, DRAW_SCALE)
    }
}

/// Same change for every instrument on every tick.
#[derive(Debug, Clone, Copy)]
pub struct FixedDrift(pub Decimal);

impl PriceDrift for FixedDrift {
    fn next_change(&self, _instrument_id: InstrumentId) -> Decimal {
        self.0.clamp(-MAX_TICK_CHANGE, MAX_TICK_CHANGE)
    }
}

/// Replays a list of changes in order, then holds at zero.
#[derive(Debug, Default)]
pub struct ScriptedDrift {
    changes: Mutex<VecDeque<Decimal>>,
}

impl ScriptedDrift {
    pub fn new(changes: impl IntoIterator<Item = Decimal>) -> Self {
        Self { changes: Mutex::new(changes.into_iter().collect()) }
    }

    pub fn remaining(&self) -> usize {
        self.changes.lock().len()
    }
}

impl PriceDrift for ScriptedDrift {
    fn next_change(&self, _instrument_id: InstrumentId) -> Decimal {
        self.changes
            .lock()
            .pop_front()
            .map(|c| c.clamp(-MAX_TICK_CHANGE, MAX_TICK_CHANGE))
            .unwrap_or(Decimal::ZERO)
    }
}
