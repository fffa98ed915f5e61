use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Pipeline branch a [`ScanError`] originated from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize, Display)]
pub enum Branch {
    #[display("liquidity_pools")]
    LiquidityPools,
    #[display("whale_footprints")]
    WhaleFootprints,
    #[display("depth_profile")]
    DepthProfile,
    #[display("quote")]
    Quote,
}

/// All errors generated by a [`MarketDataFeed`](crate::feed::MarketDataFeed).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FeedError {
    #[error("feed connection failed: {0}")]
    Connection(String),

    #[error("feed HTTP error: {0}")]
    Http(String),

    #[error("feed response parse failed: {0}")]
    Parse(String),

    #[error("feed request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Connection(format!("timeout: {error}"))
        } else if error.is_status() {
            Self::Http(error.to_string())
        } else if error.is_decode() {
            Self::Parse(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

/// All errors generated while running a scanner cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("{branch}: feed returned no data")]
    DataUnavailable { branch: Branch },

    #[error("{branch}: insufficient samples, required {required}, got {actual}")]
    InsufficientSamples {
        branch: Branch,
        required: usize,
        actual: usize,
    },

    #[error("{branch}: computation failed: {reason}")]
    ComputationFailure { branch: Branch, reason: String },

    #[error("feed connection fault: {0}")]
    FeedConnectionFault(#[from] FeedError),
}

impl ScanError {
    /// Determine if the error is an expected "nothing new to publish" condition.
    ///
    /// Expected errors skip the branch and retain the previous store value without
    /// escalating the log level or the scheduler's sleep interval.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ScanError::DataUnavailable { .. } | ScanError::InsufficientSamples { .. }
        )
    }

    /// Determine if the error should push the scheduler into its backoff interval.
    pub fn is_fault(&self) -> bool {
        !self.is_expected()
    }
}
