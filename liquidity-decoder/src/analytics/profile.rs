//! Synthetic volume-by-price profile built from trailing tick prices.
//!
//! Stands in for order book depth on venues that do not publish it: tick bid prices are
//! binned into a fixed number of equal-width buckets between the window's min and max.

use crate::{
    config::ScannerConfig,
    error::{Branch, ScanError},
    types::ProfileBucket,
};

/// Builds equal-width price histograms.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeProfileBuilder {
    buckets: usize,
}

impl Default for VolumeProfileBuilder {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl VolumeProfileBuilder {
    pub fn new(buckets: usize) -> Self {
        Self { buckets }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(config.histogram_buckets)
    }

    /// Bin `prices` and return every non-empty bucket, sorted by mid price descending.
    ///
    /// The last bucket is closed on the right so the window maximum is counted. A window
    /// with a single distinct price is binned over `[price - 0.5, price + 0.5]`.
    pub fn build(&self, prices: &[f64]) -> Result<Vec<ProfileBucket>, ScanError> {
        if prices.is_empty() {
            return Err(ScanError::DataUnavailable {
                branch: Branch::DepthProfile,
            });
        }
        if self.buckets == 0 {
            return Err(computation_failure("histogram bucket count must be non-zero"));
        }
        if prices.iter().any(|price| !price.is_finite()) {
            return Err(computation_failure("non-finite tick price"));
        }

        let (min, max) = prices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), price| {
                (min.min(*price), max.max(*price))
            });
        let (low, high) = if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let edges = Edges::new(low, high, self.buckets);
        let mut counts = vec![0u64; self.buckets];
        for price in prices {
            counts[edges.bucket(*price)] += 1;
        }

        Ok(counts
            .into_iter()
            .enumerate()
            .rev()
            .filter(|(_, count)| *count > 0)
            .map(|(index, volume)| ProfileBucket {
                mid_price: (edges.edge(index) + edges.edge(index + 1)) / 2.0,
                volume,
            })
            .collect())
    }
}

fn computation_failure(reason: &str) -> ScanError {
    ScanError::ComputationFailure {
        branch: Branch::DepthProfile,
        reason: reason.to_string(),
    }
}

/// Equal-width bucket edges over `[low, high]`.
#[derive(Clone, Copy, Debug)]
struct Edges {
    low: f64,
    high: f64,
    buckets: usize,
}

impl Edges {
    fn new(low: f64, high: f64, buckets: usize) -> Self {
        Self { low, high, buckets }
    }

    fn edge(&self, index: usize) -> f64 {
        if index >= self.buckets {
            self.high
        } else {
            self.low + (self.high - self.low) * index as f64 / self.buckets as f64
        }
    }

    /// Bucket index for `price`, correcting the scaled estimate against the exact edges.
    fn bucket(&self, price: f64) -> usize {
        let last = self.buckets - 1;
        if price >= self.high {
            return last;
        }

        let scaled = (price - self.low) * self.buckets as f64 / (self.high - self.low);
        let mut index = (scaled.max(0.0) as usize).min(last);

        if index > 0 && price < self.edge(index) {
            index -= 1;
        } else if index < last && price >= self.edge(index + 1) {
            index += 1;
        }

        index
    }
}
