use super::MarketDataFeed;
use crate::{
    error::FeedError,
    types::{Candle, Quote, TickSample},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// [`BinanceFeed`] default REST base url.
///
/// See docs: <https://developers.binance.com/docs/derivatives/usds-margined-futures/general-info>
pub const BASE_URL_BINANCE_FUTURES_USD: &str = "https://fapi.binance.com";

/// Maximum klines returned by a single `/fapi/v1/klines` request.
pub const MAX_KLINES_PER_REQUEST: usize = 1500;

/// Maximum trades returned by a single `/fapi/v1/aggTrades` request.
pub const MAX_AGG_TRADES_PER_REQUEST: usize = 1000;

/// Binance kline response format.
#[derive(Debug, Deserialize)]
struct BinanceKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

impl TryFrom<BinanceKline> for Candle {
    type Error = FeedError;

    fn try_from(kline: BinanceKline) -> Result<Self, Self::Error> {
        let parse = |field: &str| {
            field
                .parse::<f64>()
                .map_err(|error| FeedError::Parse(format!("kline field {field:?}: {error}")))
        };

        Ok(Candle {
            open_time: DateTime::from_timestamp_millis(kline.0)
                .ok_or_else(|| FeedError::Parse(format!("kline open time {}", kline.0)))?,
            open: parse(&kline.1)?,
            high: parse(&kline.2)?,
            low: parse(&kline.3)?,
            close: parse(&kline.4)?,
            volume: parse(&kline.5)?,
        })
    }
}

/// Binance aggregated trade.
///
/// See docs: <https://developers.binance.com/docs/derivatives/usds-margined-futures/market-data/rest-api/Compressed-Aggregate-Trades-List>
#[derive(Debug, Deserialize)]
struct BinanceAggTrade {
    #[serde(rename = "a")]
    id: u64,
    #[serde(rename = "p", deserialize_with = "de_str")]
    price: f64,
    #[serde(rename = "q", deserialize_with = "de_str")]
    quantity: f64,
    #[serde(rename = "T")]
    time_ms: i64,
}

impl From<&BinanceAggTrade> for TickSample {
    fn from(trade: &BinanceAggTrade) -> Self {
        TickSample {
            timestamp: trade.time_ms as f64 / 1000.0,
            bid_price: trade.price,
            volume: trade.quantity,
        }
    }
}

/// Binance best bid & ask.
#[derive(Debug, Deserialize)]
struct BinanceBookTicker {
    #[serde(rename = "bidPrice", deserialize_with = "de_str")]
    bid: f64,
    #[serde(rename = "askPrice", deserialize_with = "de_str")]
    ask: f64,
}

/// Deserialize a `String` as the desired type.
fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let data: &str = Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

/// [`MarketDataFeed`] backed by the Binance USD-M futures public REST API.
///
/// Aggregated trades stand in for ticks: the trade price is used as the tick bid since the
/// venue does not publish the prevailing bid per trade.
#[derive(Debug, Clone)]
pub struct BinanceFeed {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl BinanceFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let base_url = Url::parse(base_url).map_err(|error| {
            FeedError::Connection(format!("invalid base url {base_url}: {error}"))
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, FeedError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|error| FeedError::Connection(format!("invalid path {path}: {error}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }

    async fn get<T>(&self, url: Url) -> Result<T, FeedError>
    where
        T: DeserializeOwned,
    {
        debug!(%url, "feed request");

        // The request timeout also bounds reading the body
        let map_error = |error: reqwest::Error| {
            if error.is_timeout() {
                FeedError::Timeout(self.timeout)
            } else {
                FeedError::from(error)
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_error)?;

        if let Err(status_error) = response.error_for_status_ref() {
            return Err(FeedError::Http(status_error.to_string()));
        }

        let bytes = response.bytes().await.map_err(map_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn agg_trades(
        &self,
        symbol: &str,
        from_id: Option<u64>,
        limit: usize,
    ) -> Result<Vec<BinanceAggTrade>, FeedError> {
        let mut query = vec![
            ("symbol", symbol.to_string()),
            ("limit", limit.min(MAX_AGG_TRADES_PER_REQUEST).to_string()),
        ];
        if let Some(from_id) = from_id {
            query.push(("fromId", from_id.to_string()));
        }

        self.get(self.endpoint("/fapi/v1/aggTrades", &query)?).await
    }
}

#[async_trait]
impl MarketDataFeed for BinanceFeed {
    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        let url = self.endpoint(
            "/fapi/v1/klines",
            &[
                ("symbol", symbol.to_string()),
                ("interval", timeframe.to_string()),
                ("limit", count.min(MAX_KLINES_PER_REQUEST).to_string()),
            ],
        )?;

        let klines: Vec<BinanceKline> = self.get(url).await?;
        klines.into_iter().map(Candle::try_from).collect()
    }

    async fn get_ticks(
        &self,
        symbol: &str,
        as_of: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<TickSample>, FeedError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let cutoff_ms = as_of.timestamp_millis();
        let mut trades = self.agg_trades(symbol, None, count).await?;
        trades.retain(|trade| trade.time_ms <= cutoff_ms);

        // Page backwards through trade ids until enough history is collected
        while trades.len() < count {
            let Some(oldest) = trades.first().map(|trade| trade.id) else {
                break;
            };
            if oldest == 0 {
                break;
            }

            let limit = (count - trades.len()).min(MAX_AGG_TRADES_PER_REQUEST);
            let from_id = oldest.saturating_sub(limit as u64);
            let mut page = self.agg_trades(symbol, Some(from_id), limit).await?;
            page.retain(|trade| trade.id < oldest && trade.time_ms <= cutoff_ms);

            if page.is_empty() {
                break;
            }
            page.append(&mut trades);
            trades = page;
        }

        let skip = trades.len().saturating_sub(count);
        Ok(trades[skip..].iter().map(TickSample::from).collect())
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, FeedError> {
        let url = self.endpoint(
            "/fapi/v1/ticker/bookTicker",
            &[("symbol", symbol.to_string())],
        )?;

        let ticker: BinanceBookTicker = self.get(url).await?;
        Ok(Quote {
            bid: ticker.bid,
            ask: ticker.ask,
        })
    }

    async fn ping(&self) -> Result<(), FeedError> {
        let _: serde_json::Value = self.get(self.endpoint("/fapi/v1/ping", &[])?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_binance_kline() {
        let input = r#"
            [
                1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
                "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397",
                "28.46694368", "17928899.62484339"
            ]
        "#;

        let kline: BinanceKline = serde_json::from_str(input).unwrap();
        let actual = Candle::try_from(kline).unwrap();

        assert_eq!(
            actual,
            Candle {
                open_time: DateTime::from_timestamp_millis(1499040000000).unwrap(),
                open: 0.01634790,
                high: 0.80000000,
                low: 0.01575800,
                close: 0.01577100,
                volume: 148976.11427815,
            }
        );
    }

    #[test]
    fn test_de_binance_kline_invalid_number() {
        let input = r#"[1499040000000, "abc", "1", "1", "1", "1", 1499644799999, "1", 1, "1", "1", "0"]"#;

        let kline: BinanceKline = serde_json::from_str(input).unwrap();

        assert!(matches!(Candle::try_from(kline), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_de_binance_agg_trade() {
        let input = r#"
            {"a": 26129, "p": "1950.25", "q": "4.70443515", "f": 27781, "l": 27781,
             "T": 1498793709153, "m": true}
        "#;

        let trade: BinanceAggTrade = serde_json::from_str(input).unwrap();
        let actual = TickSample::from(&trade);

        assert_eq!(trade.id, 26129);
        assert_eq!(
            actual,
            TickSample {
                timestamp: 1498793709.153,
                bid_price: 1950.25,
                volume: 4.70443515,
            }
        );
    }

    #[test]
    fn test_de_binance_book_ticker() {
        let input = r#"
            {"symbol": "BTCUSDT", "bidPrice": "4.00000000", "bidQty": "431.00000000",
             "askPrice": "4.00000200", "askQty": "9.00000000", "time": 1589437530011}
        "#;

        let ticker: BinanceBookTicker = serde_json::from_str(input).unwrap();

        assert_eq!(ticker.bid, 4.0);
        assert_eq!(ticker.ask, 4.000002);
    }

    #[test]
    fn test_endpoint_builds_query() {
        let feed = BinanceFeed::new("https://fapi.binance.com", Duration::from_secs(1)).unwrap();

        let url = feed
            .endpoint(
                "/fapi/v1/klines",
                &[("symbol", "BTCUSDT".to_string()), ("limit", "500".to_string())],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://fapi.binance.com/fapi/v1/klines?symbol=BTCUSDT&limit=500"
        );
    }

    #[tokio::test]
    async fn test_stalled_body_is_timeout() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Headers promise a body that never finishes arriving
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await;
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{")
                .await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let timeout = Duration::from_millis(200);
        let feed = BinanceFeed::new(&format!("http://{addr}"), timeout).unwrap();

        assert_eq!(feed.ping().await, Err(FeedError::Timeout(timeout)));
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(matches!(
            BinanceFeed::new("not a url", Duration::from_secs(1)),
            Err(FeedError::Connection(_))
        ));
    }
}
