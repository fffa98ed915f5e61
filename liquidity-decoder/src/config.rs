//! Scanner configuration.
//!
//! Every tunable has a default matching the baseline scanner and may be overridden through
//! `LD_*` environment variables with [`ScannerConfig::from_env`].

use serde::Deserialize;
use smol_str::SmolStr;
use std::{str::FromStr, time::Duration};

const MAX_INTERVAL_SECS: f64 = 86_400.0;

/// Scanner configuration for a single instrument & timeframe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScannerConfig {
    /// Exchange symbol to analyse (eg/ "BTCUSDT").
    pub symbol: SmolStr,
    /// Exchange candle interval (eg/ "15m").
    pub timeframe: SmolStr,
    /// Number of candles fed to pivot extraction.
    pub candle_lookback: usize,
    /// Trailing ticks scanned for whale footprints.
    pub whale_tick_window: usize,
    /// Trailing ticks binned into the volume profile.
    pub profile_tick_window: usize,
    pub cluster_count: usize,
    pub cluster_restarts: usize,
    pub cluster_max_iterations: usize,
    pub cluster_seed: u64,
    /// Minimum pivots required before clustering runs.
    pub min_pivots: usize,
    pub histogram_buckets: usize,
    pub spike_z_threshold: f64,
    pub max_whale_events: usize,
    /// Sleep between cycles that completed without a fault.
    pub refresh_interval: Duration,
    /// Sleep after a cycle that hit a fault.
    pub error_backoff: Duration,
    /// Upper bound on each individual feed call.
    pub feed_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            symbol: SmolStr::new_static("BTCUSDT"),
            timeframe: SmolStr::new_static("15m"),
            candle_lookback: 500,
            whale_tick_window: 1000,
            profile_tick_window: 5000,
            cluster_count: 5,
            cluster_restarts: 10,
            cluster_max_iterations: 300,
            cluster_seed: 42,
            min_pivots: 10,
            histogram_buckets: 50,
            spike_z_threshold: 3.0,
            max_whale_events: 5,
            refresh_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
            feed_timeout: Duration::from_secs(10),
        }
    }
}

impl ScannerConfig {
    /// Build a configuration from `LD_*` environment variables, falling back to
    /// [`ScannerConfig::default`] for anything missing or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            parsed::<f64, _>(&lookup, key)
                .filter(|secs| secs.is_finite() && *secs > 0.0 && *secs < MAX_INTERVAL_SECS)
                .map(Duration::from_secs_f64)
                .unwrap_or(default)
        };

        Self {
            symbol: lookup("LD_SYMBOL")
                .map(|symbol| SmolStr::new(symbol.trim().to_uppercase()))
                .filter(|symbol| !symbol.is_empty())
                .unwrap_or(defaults.symbol),
            timeframe: lookup("LD_TIMEFRAME")
                .map(|timeframe| SmolStr::new(timeframe.trim()))
                .filter(|timeframe| !timeframe.is_empty())
                .unwrap_or(defaults.timeframe),
            candle_lookback: positive(
                parsed(&lookup, "LD_CANDLE_LOOKBACK"),
                defaults.candle_lookback,
            ),
            whale_tick_window: positive(
                parsed(&lookup, "LD_WHALE_TICKS"),
                defaults.whale_tick_window,
            ),
            profile_tick_window: positive(
                parsed(&lookup, "LD_PROFILE_TICKS"),
                defaults.profile_tick_window,
            ),
            cluster_count: positive(
                parsed(&lookup, "LD_CLUSTER_COUNT"),
                defaults.cluster_count,
            ),
            histogram_buckets: positive(
                parsed(&lookup, "LD_HISTOGRAM_BUCKETS"),
                defaults.histogram_buckets,
            ),
            spike_z_threshold: parsed::<f64, _>(&lookup, "LD_SPIKE_Z")
                .filter(|z| z.is_finite() && *z >= 0.0)
                .unwrap_or(defaults.spike_z_threshold),
            refresh_interval: secs("LD_REFRESH_SECS", defaults.refresh_interval),
            error_backoff: secs("LD_BACKOFF_SECS", defaults.error_backoff),
            feed_timeout: secs("LD_FEED_TIMEOUT_SECS", defaults.feed_timeout),
            ..defaults
        }
    }

    /// Set the symbol to analyse.
    pub fn with_symbol(mut self, symbol: impl Into<SmolStr>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Set the candle timeframe.
    pub fn with_timeframe(mut self, timeframe: impl Into<SmolStr>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    /// Set the normal cadence between cycles.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the backoff applied after a faulted cycle.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Set the per-call feed timeout.
    pub fn with_feed_timeout(mut self, timeout: Duration) -> Self {
        self.feed_timeout = timeout;
        self
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.trim().parse().ok())
}

fn positive<T>(value: Option<T>, default: T) -> T
where
    T: PartialOrd + Default,
{
    value.filter(|value| *value > T::default()).unwrap_or(default)
}
