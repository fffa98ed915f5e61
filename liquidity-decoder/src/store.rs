//! Shared snapshot store between the scanner and its readers.

use crate::types::{LiquidityPool, MarketSnapshot, ProfileBucket, Quote, WhaleEvent};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Holds the latest [`MarketSnapshot`].
///
/// Each field is replaced independently under a short write lock, while any number of
/// readers take consistent copies through [`MarketStateStore::read`]. A reader never sees a
/// half written field, but may see fields produced by different scanner cycles.
#[derive(Debug, Default)]
pub struct MarketStateStore {
    snapshot: RwLock<MarketSnapshot>,
}

impl MarketStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the snapshot as of now.
    pub fn read(&self) -> MarketSnapshot {
        self.snapshot.read().clone()
    }

    /// Latest published quote, if any.
    pub fn quote(&self) -> Option<Quote> {
        self.snapshot.read().quote
    }

    pub fn update_pools(&self, pools: Vec<LiquidityPool>) {
        self.snapshot.write().liquidity_pools = pools;
    }

    pub fn update_whales(&self, whales: Vec<WhaleEvent>) {
        self.snapshot.write().whale_events = whales;
    }

    pub fn update_profile(&self, profile: Vec<ProfileBucket>) {
        self.snapshot.write().depth_profile = profile;
    }

    pub fn update_quote(&self, quote: Quote) {
        self.snapshot.write().quote = Some(quote);
    }

    pub fn touch_last_update(&self, time: DateTime<Utc>) {
        self.snapshot.write().last_update = Some(time);
    }
}
