use liquidity_decoder::feed::binance::BASE_URL_BINANCE_FUTURES_USD;
use std::{net::SocketAddr, time::Duration};

/// WebSocket boundary configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Listen address for dashboard clients (`LD_WS_ADDR`).
    pub ws_addr: SocketAddr,
    /// Cadence of snapshot pushes to every client (`LD_PUBLISH_SECS`).
    pub publish_interval: Duration,
    /// Market data REST base url (`LD_FEED_URL`).
    pub feed_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_addr: SocketAddr::from(([0, 0, 0, 0], 9002)),
            publish_interval: Duration::from_secs(2),
            feed_url: BASE_URL_BINANCE_FUTURES_USD.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            ws_addr: lookup("LD_WS_ADDR")
                .and_then(|addr| addr.trim().parse().ok())
                .unwrap_or(defaults.ws_addr),
            publish_interval: lookup("LD_PUBLISH_SECS")
                .and_then(|secs| secs.trim().parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs > 0.0 && *secs <= 3600.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.publish_interval),
            feed_url: lookup("LD_FEED_URL")
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.feed_url),
        }
    }
}
