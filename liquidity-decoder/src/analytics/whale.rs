//! Whale footprint detection over per-second tick volume.
//!
//! Ticks are bucketed by whole second, the population mean & standard deviation of the
//! bucket volumes is computed, and any bucket whose volume exceeds `mean + z * std_dev`
//! is reported as a [`WhaleEvent`].

use crate::{
    config::ScannerConfig,
    error::{Branch, ScanError},
    types::{Direction, TickSample, WhaleEvent},
};
use itertools::Itertools;
use std::borrow::Cow;

/// Aggregated volume for a single epoch second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SecondBucket {
    pub second: i64,
    pub volume: f64,
    pub first_bid: f64,
    pub last_bid: f64,
}

impl SecondBucket {
    /// Aggressor direction, comparing the last bid in the second with the first.
    ///
    /// An unchanged bid is classified as [`Direction::Sell`].
    pub fn direction(&self) -> Direction {
        if self.last_bid > self.first_bid {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }
}

/// Population mean & standard deviation of a volume series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl VolumeStats {
    pub fn from_volumes(volumes: &[f64]) -> Option<Self> {
        if volumes.is_empty() {
            return None;
        }

        let n = volumes.len() as f64;
        let mean = volumes.iter().sum::<f64>() / n;
        let variance = volumes
            .iter()
            .map(|volume| (volume - mean).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    pub fn threshold(&self, z: f64) -> f64 {
        self.mean + z * self.std_dev
    }
}

/// Detects abnormal one-second volume bursts in a tick window.
#[derive(Clone, Debug, PartialEq)]
pub struct WhaleDetector {
    z_threshold: f64,
    max_events: usize,
}

impl Default for WhaleDetector {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl WhaleDetector {
    pub fn new(z_threshold: f64, max_events: usize) -> Self {
        Self {
            z_threshold,
            max_events,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(config.spike_z_threshold, config.max_whale_events)
    }

    /// Detect whale events, returning at most `max_events` of the most recent spikes in
    /// chronological order.
    pub fn detect(&self, ticks: &[TickSample]) -> Result<Vec<WhaleEvent>, ScanError> {
        if ticks.is_empty() {
            return Err(ScanError::DataUnavailable {
                branch: Branch::WhaleFootprints,
            });
        }
        if ticks
            .iter()
            .any(|tick| !tick.volume.is_finite() || !tick.bid_price.is_finite())
        {
            return Err(ScanError::ComputationFailure {
                branch: Branch::WhaleFootprints,
                reason: "non-finite tick volume or price".to_string(),
            });
        }

        let buckets = per_second_volume(ticks);
        let volumes: Vec<f64> = buckets.iter().map(|bucket| bucket.volume).collect();

        // Uniform volume can never spike, regardless of floating point noise in the stats
        let uniform = volumes.iter().all(|volume| *volume == volumes[0]);
        if uniform {
            return Ok(Vec::new());
        }

        let Some(stats) = VolumeStats::from_volumes(&volumes) else {
            return Ok(Vec::new());
        };
        let threshold = stats.threshold(self.z_threshold);

        let spikes: Vec<&SecondBucket> = buckets
            .iter()
            .filter(|bucket| bucket.volume > threshold)
            .collect();

        let events: Vec<WhaleEvent> = spikes[spikes.len().saturating_sub(self.max_events)..]
            .iter()
            .map(|bucket| WhaleEvent {
                second: bucket.second,
                total_volume: bucket.volume,
                price: bucket.last_bid,
                direction: bucket.direction(),
            })
            .collect();

        Ok(events)
    }
}

/// Sum tick volume per whole epoch second, in chronological order.
///
/// Out of order input is sorted (stable) by timestamp first.
pub fn per_second_volume(ticks: &[TickSample]) -> Vec<SecondBucket> {
    let ticks: Cow<'_, [TickSample]> =
        if ticks.is_sorted_by(|a, b| a.timestamp <= b.timestamp) {
            Cow::Borrowed(ticks)
        } else {
            let mut sorted = ticks.to_vec();
            sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
            Cow::Owned(sorted)
        };

    ticks
        .iter()
        .chunk_by(|tick| tick.second())
        .into_iter()
        .filter_map(|(second, mut group)| {
            let first = group.next()?;
            let (volume, last) = group.fold((first.volume, first), |(volume, _), tick| {
                (volume + tick.volume, tick)
            });
            Some(SecondBucket {
                second,
                volume,
                first_bid: first.bid_price,
                last_bid: last.bid_price,
            })
        })
        .collect()
}
