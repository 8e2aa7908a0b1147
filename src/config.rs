// 7.0 config.rs: all settings in one place. engine limits, tick cadence, logging.
// 7.1 from_env() lets a deployment override the preset without a config file.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::engine::EngineConfig;
use crate::instrument::HISTORY_CAP;
use crate::logging::LogConfig;
use crate::price_feed::{PriceDrift, RandomDrift};
use crate::types::Quote;
use std::sync::Arc;

/** 7.2: price scheduler cadence. one tick a minute matches the 43200-point history cap */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    // Milliseconds between ticks
    pub tick_interval_ms: u64,
    // Seed for the price drift RNG. None draws from the OS
    pub seed: Option<u64>,
}

impl SchedulerConfig {
    /// Drift source for the tick: seeded when a seed is configured.
    pub fn drift(&self) -> Arc<dyn PriceDrift> {
        match self.seed {
            Some(seed) => Arc::new(RandomDrift::with_seed(seed)),
            None => Arc::new(RandomDrift::new()),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 60_000,
            seed: None,
        }
    }
}

// Random market activity generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfig {
    // Trades attempted per run
    pub trades_per_run: usize,
    // Largest quantity a single random trade asks for
    pub max_quantity: u64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            trades_per_run: 100,
            max_quantity: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub engine: EngineConfig,
    pub scheduler: SchedulerConfig,
    pub activity: ActivityConfig,
    #[serde(skip)]
    pub logging: LogConfig,
}

impl ExchangeConfig {
    // Fast ticks and a fixed seed for local demos
    pub fn demo() -> Self {
        let mut config = Self::default();
        config.scheduler.tick_interval_ms = 250;
        config.scheduler.seed = Some(7);
        config.engine.max_events = 10_000;
        config
    }

    /// Apply `STOCKEX_*` environment overrides on top of `self`.
    ///
    /// Reads:
    /// - `STOCKEX_TICK_INTERVAL_MS`
    /// - `STOCKEX_SEED`
    /// - `STOCKEX_HISTORY_CAP`
    /// - `STOCKEX_LOAN_LIMIT`
    /// - `STOCKEX_MAX_EVENTS`
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = read_var::<u64>("STOCKEX_TICK_INTERVAL_MS")? {
            self.scheduler.tick_interval_ms = v;
        }
        if let Some(v) = read_var::<u64>("STOCKEX_SEED")? {
            self.scheduler.seed = Some(v);
        }
        if let Some(v) = read_var::<usize>("STOCKEX_HISTORY_CAP")? {
            self.engine.history_cap = v;
        }
        if let Some(v) = read_var::<Decimal>("STOCKEX_LOAN_LIMIT")? {
            self.engine.default_loan_limit = Quote::new(v);
        }
        if let Some(v) = read_var::<usize>("STOCKEX_MAX_EVENTS")? {
            self.engine.max_events = v;
        }
        self.logging = LogConfig::from_env();
        self.validate()?;
        Ok(self)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidScheduler {
                reason: "Tick interval must be positive".to_string(),
            });
        }

        if self.engine.history_cap == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "History cap must be at least 1".to_string(),
            });
        }

        if self.engine.history_cap > HISTORY_CAP {
            return Err(ConfigError::InvalidEngine {
                reason: format!("History cap cannot exceed {HISTORY_CAP}"),
            });
        }

        if self.engine.default_loan_limit.is_negative() {
            return Err(ConfigError::InvalidEngine {
                reason: "Loan limit cannot be negative".to_string(),
            });
        }

        if self.activity.max_quantity == 0 {
            return Err(ConfigError::InvalidActivity {
                reason: "Random trades need a positive max quantity".to_string(),
            });
        }

        Ok(())
    }
}

fn read_var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVariable { key: key.to_string(), value: raw }),
        Err(_) => Ok(None),
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid engine config: {reason}")]
    InvalidEngine { reason: String },
    #[error("Invalid scheduler config: {reason}")]
    InvalidScheduler { reason: String },
    #[error("Invalid activity config: {reason}")]
    InvalidActivity { reason: String },
    #[error("Cannot parse {key}={value}")]
    InvalidVariable { key: String, value: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Demo,
}

impl Environment {
    pub fn config(&self) -> ExchangeConfig {
        match self {
            Environment::Development => ExchangeConfig::default(),
            Environment::Demo => ExchangeConfig::demo(),
        }
    }
}
