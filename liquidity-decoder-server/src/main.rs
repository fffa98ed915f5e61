mod config;
mod payload;

use crate::{config::ServerConfig, payload::DashboardPayload};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use liquidity_decoder::{
    FeedError, MarketDataFeed, MarketStateStore, ScannerConfig, ScannerScheduler,
    feed::BinanceFeed,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc, watch},
    time::interval,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Client request for an immediate snapshot.
const DATA_REQUEST: &str = "data";

/// State shared with every dashboard connection.
#[derive(Debug, Clone)]
struct Dashboard {
    symbol: String,
    store: Arc<MarketStateStore>,
    updates: broadcast::Sender<String>,
}

impl Dashboard {
    fn payload_json(&self) -> Option<String> {
        let payload = DashboardPayload::new(&self.symbol, &self.store.read());
        serde_json::to_string(&payload)
            .map_err(|error| error!(%error, "failed to serialise dashboard payload"))
            .ok()
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    info!("Starting liquidity decoder");

    let scanner_config = ScannerConfig::from_env();
    let server_config = ServerConfig::from_env();
    info!(?scanner_config, ?server_config, "Configuration loaded");

    let feed = match BinanceFeed::new(&server_config.feed_url, scanner_config.feed_timeout) {
        Ok(feed) => feed,
        Err(error) => {
            error!(%error, "Invalid market data feed configuration");
            std::process::exit(1);
        }
    };

    // The scanner must not start without a working feed
    if let Err(error) = verify_feed(&feed, &scanner_config).await {
        error!(%error, url = %server_config.feed_url, "Market data feed unreachable");
        std::process::exit(1);
    }

    let listener = match TcpListener::bind(server_config.ws_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            error!(%error, addr = %server_config.ws_addr, "Failed to bind WebSocket server");
            std::process::exit(1);
        }
    };
    info!("WebSocket server listening on ws://{}", server_config.ws_addr);

    let store = Arc::new(MarketStateStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut scheduler = ScannerScheduler::new(feed, Arc::clone(&store), scanner_config.clone());
    let scheduler_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let (updates, _) = broadcast::channel(16);
    let dashboard = Dashboard {
        symbol: scanner_config.symbol.to_string(),
        store,
        updates,
    };

    tokio::spawn(publish_snapshots(
        dashboard.clone(),
        server_config.publish_interval,
    ));
    tokio::spawn(accept_clients(listener, dashboard));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(error) => error!(%error, "Failed to listen for shutdown signal"),
    }

    let _ = shutdown_tx.send(true);
    if let Err(error) = scheduler_handle.await {
        error!(%error, "Scanner task failed");
    }

    info!("Liquidity decoder stopped");
}

/// Ping the feed and fetch an initial quote, each bounded by the feed timeout.
async fn verify_feed<Feed>(feed: &Feed, config: &ScannerConfig) -> Result<(), FeedError>
where
    Feed: MarketDataFeed,
{
    let timeout = config.feed_timeout;

    tokio::time::timeout(timeout, feed.ping())
        .await
        .map_err(|_| FeedError::Timeout(timeout))??;

    let quote = tokio::time::timeout(timeout, feed.get_quote(&config.symbol))
        .await
        .map_err(|_| FeedError::Timeout(timeout))??;

    info!(
        symbol = %config.symbol,
        bid = quote.bid,
        ask = quote.ask,
        "Market data feed verified"
    );
    Ok(())
}

/// Broadcast the latest snapshot to every connected client on a fixed cadence.
async fn publish_snapshots(dashboard: Dashboard, period: Duration) {
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        if dashboard.updates.receiver_count() == 0 {
            continue;
        }
        if let Some(json) = dashboard.payload_json() {
            let _ = dashboard.updates.send(json);
        }
    }
}

async fn accept_clients(listener: TcpListener, dashboard: Dashboard) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!("New WebSocket connection from {}", peer_addr);
                tokio::spawn(handle_client(stream, peer_addr, dashboard.clone()));
            }
            Err(error) => warn!(%error, "Failed to accept WebSocket connection"),
        }
    }
}

/// Handle individual WebSocket client connection
async fn handle_client(stream: TcpStream, peer_addr: SocketAddr, dashboard: Dashboard) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake failed for {}: {}", peer_addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut updates = dashboard.updates.subscribe();
    let (request_tx, mut request_rx) = mpsc::channel::<()>(8);

    let welcome = serde_json::json!({
        "type": "welcome",
        "system": "LIQUIDITY DECODER",
        "status": "ONLINE",
        "timestamp": Utc::now()
    });
    if ws_sender
        .send(Message::Text(welcome.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    // Snapshot pushes & on-demand replies share the sink
    let mut send_task = tokio::spawn(async move {
        if let Some(json) = dashboard.payload_json() {
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }

        loop {
            let json = tokio::select! {
                update = updates.recv() => match update {
                    Ok(json) => json,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Client {} lagged, skipped {} snapshots", peer_addr, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                request = request_rx.recv() => match request {
                    Some(()) => match dashboard.payload_json() {
                        Some(json) => json,
                        None => continue,
                    },
                    None => break,
                },
            };

            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) if text.as_str().trim() == DATA_REQUEST => {
                    if request_tx.send(()).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Text(text)) => {
                    debug!("Ignoring text from {}: {}", peer_addr, text.as_str());
                }
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!("WebSocket error for {}: {}", peer_addr, e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("WebSocket connection closed for {}", peer_addr);
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
