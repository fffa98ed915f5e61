//! Core data types flowing through a scanner cycle.
//!
//! [`Candle`], [`TickSample`] and [`PivotPoint`] only live for the duration of one cycle.
//! [`LiquidityPool`], [`WhaleEvent`] and [`ProfileBucket`] are recomputed each cycle and
//! published into the [`MarketSnapshot`] held by the
//! [`MarketStateStore`](crate::store::MarketStateStore).

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// OHLCV candle for the configured symbol & timeframe.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Single executed tick.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct TickSample {
    /// Epoch time in fractional seconds.
    pub timestamp: f64,
    pub bid_price: f64,
    pub volume: f64,
}

impl TickSample {
    /// Whole epoch second this tick falls in.
    pub fn second(&self) -> i64 {
        self.timestamp.floor() as i64
    }
}

/// Best bid & ask at the time of the request.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Whether a [`PivotPoint`] is a local high or a local low.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
pub enum PivotKind {
    High,
    Low,
}

/// Local price extremum ("fractal") found in a candle window.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct PivotPoint {
    pub price: f64,
    pub kind: PivotKind,
    /// Position of the source candle in the analysed window.
    pub index: usize,
}

/// Side of the current bid a [`LiquidityPool`] sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
pub enum ZoneType {
    /// Above the bid, resting sell liquidity.
    #[display("RESISTANCE (Sell Liquidity)")]
    Resistance,
    /// At or below the bid, resting buy liquidity.
    #[display("SUPPORT (Buy Liquidity)")]
    Support,
}

impl ZoneType {
    /// Classify a zone price against the current bid.
    pub fn classify(price: f64, bid: f64) -> Self {
        if price > bid {
            ZoneType::Resistance
        } else {
            ZoneType::Support
        }
    }
}

/// Pool strength label. Pools are not weighted by population, so every pool is `High`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
pub enum Strength {
    #[default]
    #[display("HIGH")]
    High,
}

/// Clustered price zone derived from repeated pivot reactions.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct LiquidityPool {
    pub price: f64,
    pub zone_type: ZoneType,
    pub strength: Strength,
}

/// Aggressor direction inferred for a [`WhaleEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Display)]
pub enum Direction {
    #[display("BUY")]
    Buy,
    #[display("SELL")]
    Sell,
}

/// Statistically abnormal burst of traded volume within one second.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct WhaleEvent {
    /// Epoch second of the burst.
    pub second: i64,
    pub total_volume: f64,
    /// Bid of the last tick inside the second.
    pub price: f64,
    pub direction: Direction,
}

impl WhaleEvent {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.second, 0)
    }
}

/// One non-empty bin of the synthetic volume profile.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ProfileBucket {
    pub mid_price: f64,
    /// Number of ticks whose price fell inside the bin.
    pub volume: u64,
}

/// Latest published aggregate of every derived artifact.
///
/// Fields are replaced independently, so `liquidity_pools` may originate from a later cycle
/// than `whale_events` when a branch had nothing new to publish.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub liquidity_pools: Vec<LiquidityPool>,
    pub whale_events: Vec<WhaleEvent>,
    pub depth_profile: Vec<ProfileBucket>,
    pub quote: Option<Quote>,
    pub last_update: Option<DateTime<Utc>>,
}
