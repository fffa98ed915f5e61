use chrono::{DateTime, Utc};
use liquidity_decoder::{
    MarketSnapshot,
    types::{LiquidityPool, ProfileBucket, WhaleEvent},
};
use serde::Serialize;

/// Snapshot message sent to dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub spread: Option<f64>,
    pub liquidity_pools: Vec<PoolView>,
    pub whales: Vec<WhaleView>,
    pub depth: Vec<DepthView>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolView {
    pub price: f64,
    #[serde(rename = "type")]
    pub zone_type: String,
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhaleView {
    /// UTC wall clock time of the burst, "HH:MM:SS".
    pub time: String,
    pub volume: f64,
    pub price: f64,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthView {
    pub price: f64,
    pub volume: u64,
}

impl DashboardPayload {
    pub fn new(symbol: &str, snapshot: &MarketSnapshot) -> Self {
        Self {
            kind: "snapshot",
            symbol: symbol.to_string(),
            current_price: snapshot.quote.map(|quote| round_price(quote.bid)),
            spread: snapshot.quote.map(|quote| quote.spread()),
            liquidity_pools: snapshot.liquidity_pools.iter().map(PoolView::from).collect(),
            whales: snapshot.whale_events.iter().map(WhaleView::from).collect(),
            depth: snapshot.depth_profile.iter().map(DepthView::from).collect(),
            last_update: snapshot.last_update,
        }
    }
}

impl From<&LiquidityPool> for PoolView {
    fn from(pool: &LiquidityPool) -> Self {
        Self {
            price: round_price(pool.price),
            zone_type: pool.zone_type.to_string(),
            strength: pool.strength.to_string(),
        }
    }
}

impl From<&WhaleEvent> for WhaleView {
    fn from(event: &WhaleEvent) -> Self {
        Self {
            time: event
                .time()
                .map(|time| time.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            volume: event.total_volume,
            price: round_price(event.price),
            action: event.direction.to_string(),
        }
    }
}

impl From<&ProfileBucket> for DepthView {
    fn from(bucket: &ProfileBucket) -> Self {
        Self {
            price: round_price(bucket.mid_price),
            volume: bucket.volume,
        }
    }
}

fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
