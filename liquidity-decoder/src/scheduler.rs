//! Periodic scanner driving the analytics pipeline.
//!
//! Each cycle fetches a fresh quote, candles and tick windows from the [`MarketDataFeed`],
//! runs the liquidity pool, whale footprint and depth profile branches independently, and
//! publishes every successful branch result into the [`MarketStateStore`]. A branch that
//! fails keeps its previous store value.

use crate::{
    analytics::{
        ClusterEngine, VolumeProfileBuilder, WhaleDetector, extract_pivots,
        pivot::MIN_PIVOT_CANDLES, pivot_prices,
    },
    config::ScannerConfig,
    error::{Branch, FeedError, ScanError},
    feed::MarketDataFeed,
    store::MarketStateStore,
    types::{LiquidityPool, ProfileBucket, WhaleEvent},
};
use chrono::{DateTime, Utc};
use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of a [`ScannerScheduler`].
///
/// `Idle -> Running -> Sleeping -> Running -> ...` until shutdown moves it to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerState {
    Idle,
    Running {
        cycle: u64,
    },
    Sleeping {
        cycle: u64,
        outcome: CycleOutcome,
        interval: Duration,
    },
    Stopped,
}

/// Classified result of a whole cycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CycleOutcome {
    /// No branch faulted. Branches may still have been skipped.
    Success,
    /// At least one branch faulted and at least one published.
    PartialFailure,
    /// At least one branch faulted and nothing was published.
    Failure,
}

/// Result of one branch within a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    /// Fresh result published to the store.
    Updated { items: usize },
    /// Expected "nothing to publish" condition, previous store value retained.
    Skipped(ScanError),
    /// Unexpected fault, previous store value retained.
    Faulted(ScanError),
}

impl BranchOutcome {
    fn from_result(result: Result<usize, ScanError>) -> Self {
        match result {
            Ok(items) => Self::Updated { items },
            Err(error) => Self::from_error(error),
        }
    }

    fn from_error(error: ScanError) -> Self {
        if error.is_expected() {
            Self::Skipped(error)
        } else {
            Self::Faulted(error)
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }
}

/// Per-branch outcomes of a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub quote: BranchOutcome,
    pub liquidity_pools: BranchOutcome,
    pub whale_footprints: BranchOutcome,
    pub depth_profile: BranchOutcome,
}

impl CycleReport {
    pub fn branches(&self) -> [(Branch, &BranchOutcome); 4] {
        [
            (Branch::Quote, &self.quote),
            (Branch::LiquidityPools, &self.liquidity_pools),
            (Branch::WhaleFootprints, &self.whale_footprints),
            (Branch::DepthProfile, &self.depth_profile),
        ]
    }

    pub fn outcome(&self) -> CycleOutcome {
        let branches = self.branches();
        let faulted = branches.iter().any(|(_, outcome)| outcome.is_fault());
        let updated = branches.iter().any(|(_, outcome)| outcome.is_updated());

        match (faulted, updated) {
            (false, _) => CycleOutcome::Success,
            (true, true) => CycleOutcome::PartialFailure,
            (true, false) => CycleOutcome::Failure,
        }
    }
}

/// Runs scanner cycles against an exclusively owned [`MarketDataFeed`].
#[derive(Debug)]
pub struct ScannerScheduler<Feed> {
    feed: Feed,
    config: ScannerConfig,
    store: Arc<MarketStateStore>,
    cluster_engine: ClusterEngine,
    whale_detector: WhaleDetector,
    profile_builder: VolumeProfileBuilder,
    state_tx: watch::Sender<SchedulerState>,
    cycle: u64,
}

impl<Feed> ScannerScheduler<Feed>
where
    Feed: MarketDataFeed,
{
    pub fn new(feed: Feed, store: Arc<MarketStateStore>, config: ScannerConfig) -> Self {
        let (state_tx, _) = watch::channel(SchedulerState::Idle);

        Self {
            feed,
            cluster_engine: ClusterEngine::from_config(&config),
            whale_detector: WhaleDetector::from_config(&config),
            profile_builder: VolumeProfileBuilder::from_config(&config),
            config,
            store,
            state_tx,
            cycle: 0,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MarketStateStore> {
        &self.store
    }

    /// Observe [`SchedulerState`] transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    /// Run cycles until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// A cycle in progress always completes, so the store is never left mid-branch.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            symbol = %self.config.symbol,
            timeframe = %self.config.timeframe,
            "scanner started"
        );

        while !*shutdown.borrow_and_update() {
            let report = self.run_cycle().await;
            let outcome = report.outcome();
            let interval = self.interval(outcome);

            self.state_tx.send_replace(SchedulerState::Sleeping {
                cycle: report.cycle,
                outcome,
                interval,
            });

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        info!(cycles = self.cycle, "scanner stopped");
    }

    /// Sleep duration following a cycle with the provided outcome.
    pub fn interval(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Success => self.config.refresh_interval,
            CycleOutcome::PartialFailure | CycleOutcome::Failure => self.config.error_backoff,
        }
    }

    /// Run a single cycle, publishing each successful branch to the store.
    ///
    /// `last_update` is refreshed unless the cycle is a [`CycleOutcome::Failure`].
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;
        self.state_tx.send_replace(SchedulerState::Running { cycle });

        let started = Instant::now();
        let as_of = Utc::now();

        // Pools fall back to the last published bid if the quote request fails
        let (quote, bid) = match self
            .fetch(Branch::Quote, self.feed.get_quote(&self.config.symbol))
            .await
        {
            Ok(quote) => {
                self.store.update_quote(quote);
                (BranchOutcome::Updated { items: 1 }, Some(quote.bid))
            }
            Err(error) => (
                BranchOutcome::from_error(error),
                self.store.quote().map(|quote| quote.bid),
            ),
        };

        let liquidity_pools = BranchOutcome::from_result(self.scan_pools(bid).await.map(|pools| {
            let items = pools.len();
            self.store.update_pools(pools);
            items
        }));

        let whale_footprints =
            BranchOutcome::from_result(self.scan_whales(as_of).await.map(|whales| {
                let items = whales.len();
                self.store.update_whales(whales);
                items
            }));

        let depth_profile =
            BranchOutcome::from_result(self.scan_profile(as_of).await.map(|profile| {
                let items = profile.len();
                self.store.update_profile(profile);
                items
            }));

        let report = CycleReport {
            cycle,
            quote,
            liquidity_pools,
            whale_footprints,
            depth_profile,
        };

        let outcome = report.outcome();
        if outcome != CycleOutcome::Failure {
            self.store.touch_last_update(Utc::now());
        }

        log_report(&report, outcome, started.elapsed());
        report
    }

    async fn scan_pools(&self, bid: Option<f64>) -> Result<Vec<LiquidityPool>, ScanError> {
        let candles = self
            .fetch(
                Branch::LiquidityPools,
                self.feed.get_candles(
                    &self.config.symbol,
                    &self.config.timeframe,
                    self.config.candle_lookback,
                ),
            )
            .await?;

        if candles.is_empty() {
            return Err(ScanError::DataUnavailable {
                branch: Branch::LiquidityPools,
            });
        }
        if candles.len() < MIN_PIVOT_CANDLES {
            return Err(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: MIN_PIVOT_CANDLES,
                actual: candles.len(),
            });
        }

        let prices = pivot_prices(&extract_pivots(&candles));
        if prices.len() < self.config.min_pivots {
            return Err(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: self.config.min_pivots,
                actual: prices.len(),
            });
        }

        let bid = bid.ok_or(ScanError::DataUnavailable {
            branch: Branch::Quote,
        })?;

        self.cluster_engine.liquidity_pools(&prices, bid)
    }

    async fn scan_whales(&self, as_of: DateTime<Utc>) -> Result<Vec<WhaleEvent>, ScanError> {
        let ticks = self
            .fetch(
                Branch::WhaleFootprints,
                self.feed.get_ticks(&self.config.symbol, as_of, self.config.whale_tick_window),
            )
            .await?;

        self.whale_detector.detect(&ticks)
    }

    async fn scan_profile(&self, as_of: DateTime<Utc>) -> Result<Vec<ProfileBucket>, ScanError> {
        let ticks = self
            .fetch(
                Branch::DepthProfile,
                self.feed.get_ticks(&self.config.symbol, as_of, self.config.profile_tick_window),
            )
            .await?;

        let prices: Vec<f64> = ticks.iter().map(|tick| tick.bid_price).collect();
        self.profile_builder.build(&prices)
    }

    /// Await a feed request, bounded by the configured feed timeout.
    ///
    /// A request that outlives the timeout yields no data for `branch`.
    async fn fetch<T, Request>(&self, branch: Branch, request: Request) -> Result<T, ScanError>
    where
        Request: Future<Output = Result<T, FeedError>>,
    {
        match tokio::time::timeout(self.config.feed_timeout, request).await {
            Ok(Err(FeedError::Timeout(_))) | Err(_) => {
                debug!(%branch, timeout = ?self.config.feed_timeout, "feed request timed out");
                Err(ScanError::DataUnavailable { branch })
            }
            Ok(response) => Ok(response?),
        }
    }
}

fn log_report(report: &CycleReport, outcome: CycleOutcome, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;

    for (branch, branch_outcome) in report.branches() {
        match branch_outcome {
            BranchOutcome::Updated { items } => {
                debug!(cycle = report.cycle, %branch, items, "branch updated")
            }
            BranchOutcome::Skipped(error) => {
                debug!(cycle = report.cycle, %branch, %error, "branch skipped")
            }
            BranchOutcome::Faulted(error) => {
                warn!(cycle = report.cycle, %branch, %error, "branch faulted")
            }
        }
    }

    match outcome {
        CycleOutcome::Success => {
            debug!(cycle = report.cycle, ?outcome, elapsed_ms, "cycle complete")
        }
        CycleOutcome::PartialFailure | CycleOutcome::Failure => {
            warn!(cycle = report.cycle, ?outcome, elapsed_ms, "cycle complete with faults")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candle, Direction, Quote, Strength, TickSample, ZoneType};
    use async_trait::async_trait;

    const BASE: f64 = 1_700_000_000.0;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Feed returning canned responses.
    #[derive(Debug, Clone)]
    struct ScriptedFeed {
        candles: Result<Vec<Candle>, FeedError>,
        ticks: Result<Vec<TickSample>, FeedError>,
        quote: Result<Quote, FeedError>,
        tick_delay: Option<Duration>,
    }

    impl ScriptedFeed {
        fn new(candles: Vec<Candle>, ticks: Vec<TickSample>) -> Self {
            Self {
                candles: Ok(candles),
                ticks: Ok(ticks),
                quote: Ok(Quote {
                    bid: 1900.0,
                    ask: 1900.5,
                }),
                tick_delay: None,
            }
        }

        fn unreachable() -> Self {
            let error = FeedError::Connection("connection refused".to_string());
            Self {
                candles: Err(error.clone()),
                ticks: Err(error.clone()),
                quote: Err(error),
                tick_delay: None,
            }
        }
    }

    #[async_trait]
    impl MarketDataFeed for ScriptedFeed {
        async fn get_candles(
            &self,
            _: &str,
            _: &str,
            count: usize,
        ) -> Result<Vec<Candle>, FeedError> {
            let candles = self.candles.clone()?;
            Ok(candles[candles.len().saturating_sub(count)..].to_vec())
        }

        async fn get_ticks(
            &self,
            _: &str,
            _: DateTime<Utc>,
            count: usize,
        ) -> Result<Vec<TickSample>, FeedError> {
            if let Some(delay) = self.tick_delay {
                tokio::time::sleep(delay).await;
            }
            let ticks = self.ticks.clone()?;
            Ok(ticks[ticks.len().saturating_sub(count)..].to_vec())
        }

        async fn get_quote(&self, _: &str) -> Result<Quote, FeedError> {
            self.quote.clone()
        }
    }

    fn candle(index: usize, high: f64, low: f64) -> Candle {
        Candle {
            open_time: DateTime::<Utc>::from_timestamp(1_700_000_000 + index as i64 * 900, 0)
                .unwrap(),
            open: low,
            high,
            low,
            close: high,
            volume: 1.0,
        }
    }

    /// Four candle swings with a peak at phase 2 and a trough at phase 0 of each swing.
    fn zigzag_candles(swings: usize) -> Vec<Candle> {
        (0..swings * 4)
            .map(|index| {
                let swing = (index / 4 % 5) as f64;
                match index % 4 {
                    0 => candle(index, 1900.0, 1850.0 - 10.0 * swing),
                    1 | 3 => candle(index, 1905.0, 1880.0),
                    _ => candle(index, 1950.0 + 10.0 * swing, 1890.0),
                }
            })
            .collect()
    }

    fn flat_candles(count: usize) -> Vec<Candle> {
        (0..count).map(|index| candle(index, 1900.0, 1890.0)).collect()
    }

    /// One tick per second at constant volume, except `spikes`.
    fn tick_series(prices: &[f64], spikes: &[(usize, f64)]) -> Vec<TickSample> {
        prices
            .iter()
            .enumerate()
            .map(|(second, price)| TickSample {
                timestamp: BASE + second as f64,
                bid_price: *price,
                volume: spikes
                    .iter()
                    .find(|(index, _)| *index == second)
                    .map_or(1.0, |(_, volume)| *volume),
            })
            .collect()
    }

    fn uniform_prices(low: f64, high: f64, count: usize) -> Vec<f64> {
        (0..count)
            .map(|index| low + (high - low) * index as f64 / (count - 1) as f64)
            .collect()
    }

    fn scheduler(feed: ScriptedFeed, config: ScannerConfig) -> ScannerScheduler<ScriptedFeed> {
        init_logging();
        ScannerScheduler::new(feed, Arc::new(MarketStateStore::new()), config)
    }

    fn previous_pools() -> Vec<LiquidityPool> {
        vec![
            LiquidityPool {
                price: 2100.0,
                zone_type: ZoneType::Resistance,
                strength: Strength::High,
            },
            LiquidityPool {
                price: 1700.0,
                zone_type: ZoneType::Support,
                strength: Strength::High,
            },
        ]
    }

    #[tokio::test]
    async fn test_run_cycle_publishes_every_branch() {
        let ticks = tick_series(&[1900.0; 1000], &[(700, 50.0)]);
        let mut scheduler = scheduler(
            ScriptedFeed::new(zigzag_candles(10), ticks),
            ScannerConfig::default(),
        );

        let report = scheduler.run_cycle().await;
        let snapshot = scheduler.store().read();

        assert_eq!(report.cycle, 1);
        assert_eq!(report.outcome(), CycleOutcome::Success);
        assert_eq!(report.quote, BranchOutcome::Updated { items: 1 });
        assert!(report.liquidity_pools.is_updated());
        assert_eq!(report.whale_footprints, BranchOutcome::Updated { items: 1 });
        assert_eq!(report.depth_profile, BranchOutcome::Updated { items: 1 });

        assert!(!snapshot.liquidity_pools.is_empty());
        assert!(snapshot.liquidity_pools.len() <= 5);
        assert!(
            snapshot
                .liquidity_pools
                .windows(2)
                .all(|pair| pair[0].price > pair[1].price)
        );
        for pool in &snapshot.liquidity_pools {
            assert_eq!(pool.zone_type, ZoneType::classify(pool.price, 1900.0));
        }

        assert_eq!(
            snapshot.whale_events,
            vec![WhaleEvent {
                second: BASE as i64 + 700,
                total_volume: 50.0,
                price: 1900.0,
                direction: Direction::Sell,
            }]
        );
        assert_eq!(snapshot.depth_profile[0].volume, 1000);
        assert_eq!(snapshot.quote.map(|quote| quote.spread()), Some(0.5));
        assert!(snapshot.last_update.is_some());
    }

    #[tokio::test]
    async fn test_flat_candles_retain_previous_pools() {
        let ticks = tick_series(&[1900.0; 100], &[]);
        let mut scheduler = scheduler(
            ScriptedFeed::new(flat_candles(500), ticks),
            ScannerConfig::default(),
        );
        scheduler.store().update_pools(previous_pools());

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.liquidity_pools,
            BranchOutcome::Skipped(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: 10,
                actual: 0,
            })
        );
        assert_eq!(report.outcome(), CycleOutcome::Success);
        assert_eq!(scheduler.store().read().liquidity_pools, previous_pools());
    }

    #[tokio::test]
    async fn test_short_candle_window_is_insufficient() {
        let mut scheduler = scheduler(
            ScriptedFeed::new(flat_candles(4), tick_series(&[1900.0; 10], &[])),
            ScannerConfig::default(),
        );

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.liquidity_pools,
            BranchOutcome::Skipped(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: 5,
                actual: 4,
            })
        );
    }

    #[tokio::test]
    async fn test_uniform_ticks_profile_spans_range() {
        let ticks = tick_series(&uniform_prices(1900.0, 2000.0, 5000), &[]);
        let mut scheduler = scheduler(
            ScriptedFeed::new(flat_candles(500), ticks),
            ScannerConfig::default(),
        );

        let report = scheduler.run_cycle().await;
        let profile = scheduler.store().read().depth_profile;

        assert_eq!(report.depth_profile, BranchOutcome::Updated { items: 50 });
        assert_eq!(report.whale_footprints, BranchOutcome::Updated { items: 0 });
        assert!((profile[0].mid_price - 1999.0).abs() < 1e-6);
        assert!((profile[49].mid_price - 1901.0).abs() < 1e-6);

        let tolerance = 3.0 * (5000.0_f64 * (1.0 / 50.0) * (49.0 / 50.0)).sqrt();
        assert!(
            profile
                .iter()
                .all(|bucket| (bucket.volume as f64 - 100.0).abs() <= tolerance)
        );
        assert_eq!(profile.iter().map(|bucket| bucket.volume).sum::<u64>(), 5000);
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_failure_and_retains_store() {
        let mut scheduler = scheduler(ScriptedFeed::unreachable(), ScannerConfig::default());
        scheduler.store().update_pools(previous_pools());
        let before = scheduler.store().read();

        let report = scheduler.run_cycle().await;

        assert_eq!(report.outcome(), CycleOutcome::Failure);
        assert!(report.branches().iter().all(|(_, outcome)| outcome.is_fault()));
        assert_eq!(scheduler.store().read(), before);
        assert_eq!(
            scheduler.interval(report.outcome()),
            ScannerConfig::default().error_backoff
        );
    }

    #[tokio::test]
    async fn test_tick_fault_is_partial_failure() {
        let mut feed = ScriptedFeed::new(zigzag_candles(10), Vec::new());
        feed.ticks = Err(FeedError::Http("503 Service Unavailable".to_string()));
        let mut scheduler = scheduler(feed, ScannerConfig::default());

        let report = scheduler.run_cycle().await;

        assert_eq!(report.outcome(), CycleOutcome::PartialFailure);
        assert!(report.whale_footprints.is_fault());
        assert!(report.depth_profile.is_fault());
        assert!(report.liquidity_pools.is_updated());
        assert!(scheduler.store().read().last_update.is_some());
    }

    #[tokio::test]
    async fn test_quote_fault_falls_back_to_published_bid() {
        let mut feed = ScriptedFeed::new(zigzag_candles(10), tick_series(&[1900.0; 10], &[]));
        feed.quote = Err(FeedError::Connection("reset by peer".to_string()));
        let mut scheduler = scheduler(feed, ScannerConfig::default());

        // No bid published yet
        let report = scheduler.run_cycle().await;
        assert_eq!(
            report.liquidity_pools,
            BranchOutcome::Skipped(ScanError::DataUnavailable {
                branch: Branch::Quote
            })
        );

        scheduler.store().update_quote(Quote {
            bid: 1900.0,
            ask: 1901.0,
        });
        let report = scheduler.run_cycle().await;
        assert!(report.quote.is_fault());
        assert!(report.liquidity_pools.is_updated());
    }

    #[tokio::test]
    async fn test_slow_feed_call_times_out_its_branch() {
        let mut feed = ScriptedFeed::new(zigzag_candles(10), tick_series(&[1900.0; 10], &[]));
        feed.tick_delay = Some(Duration::from_secs(5));
        let config = ScannerConfig::default().with_feed_timeout(Duration::from_millis(20));
        let mut scheduler = scheduler(feed, config);

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.whale_footprints,
            BranchOutcome::Skipped(ScanError::DataUnavailable {
                branch: Branch::WhaleFootprints
            })
        );
        assert_eq!(
            report.depth_profile,
            BranchOutcome::Skipped(ScanError::DataUnavailable {
                branch: Branch::DepthProfile
            })
        );
        assert!(report.liquidity_pools.is_updated());
        assert_eq!(report.outcome(), CycleOutcome::Success);
        assert_eq!(
            scheduler.interval(report.outcome()),
            ScannerConfig::default().refresh_interval
        );
    }

    #[tokio::test]
    async fn test_client_timeout_is_data_unavailable() {
        let mut feed = ScriptedFeed::new(zigzag_candles(10), Vec::new());
        feed.ticks = Err(FeedError::Timeout(Duration::from_secs(10)));
        let mut scheduler = scheduler(feed, ScannerConfig::default());

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.whale_footprints,
            BranchOutcome::Skipped(ScanError::DataUnavailable {
                branch: Branch::WhaleFootprints
            })
        );
        assert_eq!(report.outcome(), CycleOutcome::Success);
    }

    #[tokio::test]
    async fn test_slow_feed_call_retains_previous_value() {
        let mut feed = ScriptedFeed::new(flat_candles(500), tick_series(&[1900.0; 10], &[]));
        feed.tick_delay = Some(Duration::from_secs(5));
        let config = ScannerConfig::default().with_feed_timeout(Duration::from_millis(20));
        let mut scheduler = scheduler(feed, config);
        let profile = vec![ProfileBucket {
            mid_price: 1950.0,
            volume: 7,
        }];
        scheduler.store().update_profile(profile.clone());

        let report = scheduler.run_cycle().await;

        assert!(!report.depth_profile.is_fault());
        assert_eq!(scheduler.store().read().depth_profile, profile);
    }

    #[tokio::test]
    async fn test_too_few_pivots_reported_before_missing_bid() {
        let mut feed = ScriptedFeed::new(flat_candles(500), tick_series(&[1900.0; 10], &[]));
        feed.quote = Err(FeedError::Connection("reset by peer".to_string()));
        let mut scheduler = scheduler(feed, ScannerConfig::default());

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.liquidity_pools,
            BranchOutcome::Skipped(ScanError::InsufficientSamples {
                branch: Branch::LiquidityPools,
                required: 10,
                actual: 0,
            })
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let config = ScannerConfig::default()
            .with_refresh_interval(Duration::from_millis(10))
            .with_error_backoff(Duration::from_millis(30));
        let mut scheduler = scheduler(ScriptedFeed::unreachable(), config);
        let mut state_rx = scheduler.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
            scheduler
        });

        let sleeping = *state_rx
            .wait_for(|state| matches!(state, SchedulerState::Sleeping { .. }))
            .await
            .unwrap();
        assert_eq!(
            sleeping,
            SchedulerState::Sleeping {
                cycle: 1,
                outcome: CycleOutcome::Failure,
                interval: Duration::from_millis(30),
            }
        );

        shutdown_tx.send(true).unwrap();
        let scheduler = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(*scheduler.subscribe().borrow(), SchedulerState::Stopped);
        assert_eq!(scheduler.store().read().last_update, None);
    }
}
