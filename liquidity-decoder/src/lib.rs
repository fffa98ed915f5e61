#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Liquidity Decoder
//! Heuristic market structure scanner for a single instrument.
//!
//! On a fixed interval the [`ScannerScheduler`] pulls candles, ticks and a quote from a
//! [`MarketDataFeed`] and derives:
//! * **Liquidity pools**: fractal pivots clustered into at most five price zones, each
//!   classified as support or resistance against the current bid.
//! * **Whale footprints**: one-second volume bursts above `mean + 3 * std_dev`.
//! * **Depth profile**: a 50 bucket volume-by-price histogram of recent ticks.
//!
//! Results are published field by field into a [`MarketStateStore`], which any number of
//! readers can snapshot concurrently. A branch that fails or has nothing new keeps its
//! previous value.
//!
//! ## Example
//! ```rust,no_run
//! use liquidity_decoder::{
//!     MarketStateStore, ScannerConfig, ScannerScheduler, feed::BinanceFeed,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScannerConfig::from_env();
//!     let feed = BinanceFeed::new("https://fapi.binance.com", config.feed_timeout).unwrap();
//!     let store = Arc::new(MarketStateStore::new());
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let mut scheduler = ScannerScheduler::new(feed, Arc::clone(&store), config);
//!     tokio::spawn(async move { scheduler.run(shutdown_rx).await });
//!
//!     println!("{:?}", store.read());
//! }
//! ```

/// Pivot extraction, clustering, whale detection & volume profile.
pub mod analytics;

/// [`ScannerConfig`] and its environment overrides.
pub mod config;

/// All [`Error`](std::error::Error)s generated in Liquidity Decoder.
pub mod error;

/// [`MarketDataFeed`] trait and exchange implementations.
pub mod feed;

/// Periodic [`ScannerScheduler`] and its cycle reporting.
pub mod scheduler;

/// Concurrent [`MarketStateStore`] holding the latest [`MarketSnapshot`].
pub mod store;

/// Candles, ticks, pools, whale events & profile buckets.
pub mod types;

pub use config::ScannerConfig;
pub use error::{Branch, FeedError, ScanError};
pub use feed::MarketDataFeed;
pub use scheduler::{BranchOutcome, CycleOutcome, CycleReport, ScannerScheduler, SchedulerState};
pub use store::MarketStateStore;
pub use types::MarketSnapshot;

