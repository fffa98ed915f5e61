//! Fractal pivot extraction over a candle window.

use crate::types::{Candle, PivotKind, PivotPoint};

/// Number of neighbouring candles on each side a pivot must dominate.
pub const PIVOT_RADIUS: usize = 2;

/// Minimum window length that contains at least one classifiable candle.
pub const MIN_PIVOT_CANDLES: usize = 2 * PIVOT_RADIUS + 1;

/// Extract fractal highs & lows from an ordered candle window.
///
/// A candle is a [`PivotKind::High`] if its high is strictly greater than the highs of the
/// two candles either side of it, and a [`PivotKind::Low`] if its low is strictly lower than
/// their lows. A candle may produce one of each. The first and last [`PIVOT_RADIUS`] candles
/// are never classified, so windows shorter than [`MIN_PIVOT_CANDLES`] yield nothing.
pub fn extract_pivots(candles: &[Candle]) -> Vec<PivotPoint> {
    if candles.len() < MIN_PIVOT_CANDLES {
        return Vec::new();
    }

    candles
        .windows(MIN_PIVOT_CANDLES)
        .enumerate()
        .flat_map(|(start, window)| {
            let index = start + PIVOT_RADIUS;
            let centre = &window[PIVOT_RADIUS];
            let neighbours = || {
                window
                    .iter()
                    .enumerate()
                    .filter(|(offset, _)| *offset != PIVOT_RADIUS)
                    .map(|(_, candle)| candle)
            };

            let high = neighbours()
                .all(|candle| centre.high > candle.high)
                .then_some(PivotPoint {
                    price: centre.high,
                    kind: PivotKind::High,
                    index,
                });

            let low = neighbours()
                .all(|candle| centre.low < candle.low)
                .then_some(PivotPoint {
                    price: centre.low,
                    kind: PivotKind::Low,
                    index,
                });

            high.into_iter().chain(low)
        })
        .collect()
}

/// Pivot prices in extraction order, ready for clustering.
pub fn pivot_prices(pivots: &[PivotPoint]) -> Vec<f64> {
    pivots.iter().map(|pivot| pivot.price).collect()
}
