/// Fractal pivot extraction from a candle window.
pub mod pivot;

/// Deterministic multi-restart k-means over pivot prices, producing
/// [`LiquidityPool`](crate::types::LiquidityPool)s.
pub mod cluster;

/// Per-second volume spike detection producing [`WhaleEvent`](crate::types::WhaleEvent)s.
pub mod whale;

/// Equal-width price histogram producing [`ProfileBucket`](crate::types::ProfileBucket)s.
pub mod profile;

pub use cluster::{ClusterEngine, Clustering};
pub use pivot::{extract_pivots, pivot_prices};
pub use profile::VolumeProfileBuilder;
pub use whale::{SecondBucket, VolumeStats, WhaleDetector, per_second_volume};
