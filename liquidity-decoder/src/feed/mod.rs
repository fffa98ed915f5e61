use crate::{
    error::FeedError,
    types::{Candle, Quote, TickSample},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Binance USD-M futures REST [`MarketDataFeed`].
pub mod binance;

pub use binance::BinanceFeed;

/// Source of candles, ticks and quotes for a single instrument.
///
/// A feed is owned exclusively by the [`ScannerScheduler`](crate::scheduler::ScannerScheduler)
/// and is only ever called from its task.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Most recent `count` candles of `timeframe`, oldest first.
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>, FeedError>;

    /// Most recent `count` ticks at or before `as_of`, oldest first.
    async fn get_ticks(
        &self,
        symbol: &str,
        as_of: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<TickSample>, FeedError>;

    /// Current best bid & ask.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, FeedError>;

    /// Check the feed is reachable.
    async fn ping(&self) -> Result<(), FeedError> {
        Ok(())
    }
}
