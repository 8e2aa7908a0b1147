// 3.0: listed instruments. inventory, current price, bounded price history,
// and the 24h / 7d / 30d performance windows derived from it.

use crate::types::{InstrumentId, Price, Quantity, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 30 days of one-minute ticks.
pub const HISTORY_CAP: usize = 43_200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: Price,
    pub timestamp: Timestamp,
}

/// Percentage change over trailing windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Performance {
    pub daily_change: Decimal,
    pub weekly_change: Decimal,
    pub monthly_change: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub name: String,
    pub available_quantity: Quantity,
    pub current_price: Price,
    pub price_history: VecDeque<PricePoint>,
    pub performance: Performance,
}

/// Enough of the previous state to put an instrument back after a failed write.
#[derive(Debug, Clone)]
pub struct PriceUndo {
    price: Price,
    performance: Performance,
    evicted: Vec<PricePoint>,
}

impl Instrument {
    pub fn new(id: InstrumentId, name: impl Into<String>, available_quantity: Quantity, price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            available_quantity,
            current_price: price,
            price_history: VecDeque::new(),
            performance: Performance::default(),
        }
    }

    /// Move to `price`, record it in history, trim to `cap`, refresh performance.
    pub fn apply_price(&mut self, price: Price, now: Timestamp, cap: usize) -> PriceUndo {
        let mut undo = PriceUndo {
            price: self.current_price,
            performance: self.performance,
            evicted: Vec::new(),
        };

        self.current_price = price;
        self.price_history.push_back(PricePoint { price, timestamp: now });
        while self.price_history.len() > cap {
            if let Some(oldest) = self.price_history.pop_front() {
                undo.evicted.push(oldest);
            }
        }
        self.performance = calculate_performance(&self.price_history, now);
        undo
    }

    pub fn revert_price(&mut self, undo: PriceUndo) {
        self.price_history.pop_back();
        for point in undo.evicted.into_iter().rev() {
            self.price_history.push_front(point);
        }
        self.current_price = undo.price;
        self.performance = undo.performance;
    }
}

/// Draw-independent part of a tick: apply a fractional change and keep the
/// result inside the listing band at cent precision.
pub fn next_price(current: Price, change: Decimal) -> Price {
    Price::clamped(current.value() * (Decimal::ONE + change))
}

// earliest point at or after the cutoff, else the current price
fn window_reference(history: &VecDeque<PricePoint>, cutoff: Timestamp, current: Price) -> Price {
    history
        .iter()
        .find(|p| p.timestamp >= cutoff)
        .map(|p| p.price)
        .unwrap_or(current)
}

fn percentage_change(current: Price, reference: Price) -> Decimal {
    (current.value() - reference.value()) / reference.value() * dec!(100)
}

pub fn calculate_performance(history: &VecDeque<PricePoint>, now: Timestamp) -> Performance {
    if history.len() < 2 {
        return Performance::default();
    }
    let Some(last) = history.back() else {
        return Performance::default();
    };
    let current = last.price;
    let change_since = |window_ms: i64| {
        let reference = window_reference(history, now.minus_millis(window_ms), current);
        percentage_change(current, reference)
    };

    Performance {
        daily_change: change_since(Timestamp::DAY),
        weekly_change: change_since(7 * Timestamp::DAY),
        monthly_change: change_since(30 * Timestamp::DAY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(v: Decimal) -> Price {
        Price::new_unchecked(v)
    }

    fn history(points: &[(i64, Decimal)]) -> VecDeque<PricePoint> {
        points
            .iter()
            .map(|(ts, p)| PricePoint { price: price(*p), timestamp: Timestamp::from_millis(*ts) })
            .collect()
    }

    #[test]
    fn next_price_clamps_both_ends() {
        assert_eq!(next_price(price(dec!(100)), dec!(0.02)).value(), dec!(100));
        assert_eq!(next_price(price(dec!(1)), dec!(-0.02)).value(), dec!(1));
        assert_eq!(next_price(price(dec!(50)), dec!(0.01)).value(), dec!(50.50));
        assert_eq!(next_price(price(dec!(33.33)), dec!(0.013)).value(), dec!(33.76));
    }

    #[test]
    fn performance_needs_two_points() {
        let h = history(&[(0, dec!(10))]);
        assert_eq!(calculate_performance(&h, Timestamp::from_millis(0)), Performance::default());
    }

    #[test]
    fn performance_uses_earliest_point_inside_window() {
        let now = 40 * Timestamp::DAY;
        let h = history(&[
            (now - 35 * Timestamp::DAY, dec!(5)),  // outside every window
            (now - 20 * Timestamp::DAY, dec!(40)), // monthly reference
            (now - 3 * Timestamp::DAY, dec!(25)),  // weekly reference
            (now - 2 * Timestamp::HOUR, dec!(20)), // daily reference
            (now, dec!(50)),
        ]);
        let perf = calculate_performance(&h, Timestamp::from_millis(now));
        assert_eq!(perf.daily_change, dec!(150));
        assert_eq!(perf.weekly_change, dec!(100));
        assert_eq!(perf.monthly_change, dec!(25));
    }

    #[test]
    fn performance_falls_back_to_current_price() {
        // every point is older than the window except the latest one,
        // which is itself the earliest point inside the window
        let now = 100 * Timestamp::DAY;
        let h = history(&[(0, dec!(10)), (now, dec!(20))]);
        let perf = calculate_performance(&h, Timestamp::from_millis(now));
        assert_eq!(perf, Performance::default());
    }

    #[test]
    fn apply_price_trims_history_to_cap() {
        let mut inst = Instrument::new(InstrumentId(1), "ACME", 100, price(dec!(10)));
        for i in 0..7 {
            inst.apply_price(price(dec!(10) + Decimal::from(i)), Timestamp::from_millis(i), 5);
        }
        assert_eq!(inst.price_history.len(), 5);
        assert_eq!(inst.price_history.front().unwrap().timestamp, Timestamp::from_millis(2));
        assert_eq!(inst.current_price.value(), dec!(16));
    }

    #[test]
    fn revert_restores_evicted_points() {
        let mut inst = Instrument::new(InstrumentId(1), "ACME", 100, price(dec!(10)));
        for i in 0..3 {
            inst.apply_price(price(dec!(10) + Decimal::from(i)), Timestamp::from_millis(i), 3);
        }
        let before = inst.clone();

        let undo = inst.apply_price(price(dec!(99)), Timestamp::from_millis(10), 3);
        inst.revert_price(undo);

        assert_eq!(inst.current_price, before.current_price);
        assert_eq!(inst.performance, before.performance);
        assert_eq!(inst.price_history, before.price_history);
    }
}
