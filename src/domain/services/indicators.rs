//! Technical indicators over OHLCV candle series.
//!
//! Every indicator returns one value per input candle. Rows without enough
//! history for the indicator's window are `None`; nothing is back-filled.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles ascending by timestamp, one per interval
pub type CandleSeries = Vec<Candle>;

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

pub trait Indicator {
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>>;
}

fn closes(candles: &[Candle]) -> Vec<Option<f64>> {
    candles.iter().map(|c| Some(c.close)).collect()
}

/// Exponentially weighted mean without bias adjustment, seeded with the
/// first observation. Output is `None` until `min_periods` observations
/// have been seen.
fn ewm(values: &[Option<f64>], alpha: f64, min_periods: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut mean: Option<f64> = None;
    let mut seen = 0usize;

    for value in values {
        if let Some(v) = value {
            seen += 1;
            mean = Some(match mean {
                None => *v,
                Some(m) => alpha * v + (1.0 - alpha) * m,
            });
        }
        out.push(if seen >= min_periods { mean } else { None });
    }

    out
}

fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice: Option<Vec<f64>> = values[i + 1 - window..=i].iter().copied().collect();
            slice.and_then(|s| f(&s))
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub struct SMA {
    pub period: usize,
}

impl SMA {
    pub fn new(period: usize) -> Self {
        SMA { period }
    }
}

impl Indicator for SMA {
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        rolling(&closes(candles), self.period, mean)
    }
}

pub struct EMA {
    pub period: usize,
}

impl EMA {
    pub fn new(period: usize) -> Self {
        EMA { period }
    }

    pub fn calculate_on_values(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        if self.period == 0 {
            return vec![None; values.len()];
        }
        let alpha = 2.0 / (self.period as f64 + 1.0);
        ewm(values, alpha, self.period)
    }
}

impl Indicator for EMA {
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_on_values(&closes(candles))
    }
}

/// Relative strength index with Wilder smoothing
pub struct RSI {
    pub period: usize,
}

impl RSI {
    pub fn new(period: usize) -> Self {
        RSI { period }
    }
}

impl Indicator for RSI {
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        if self.period == 0 || candles.is_empty() {
            return vec![None; candles.len()];
        }

        let mut gains = Vec::with_capacity(candles.len());
        let mut losses = Vec::with_capacity(candles.len());
        // The first row has no previous close and contributes no movement
        gains.push(Some(0.0));
        losses.push(Some(0.0));
        for pair in candles.windows(2) {
            let change = pair[1].close - pair[0].close;
            gains.push(Some(change.max(0.0)));
            losses.push(Some((-change).max(0.0)));
        }

        let alpha = 1.0 / self.period as f64;
        let avg_gain = ewm(&gains, alpha, self.period);
        let avg_loss = ewm(&losses, alpha, self.period);

        avg_gain
            .iter()
            .zip(avg_loss.iter())
            .map(|(gain, loss)| match (gain, loss) {
                (Some(g), Some(l)) => Some(if *l == 0.0 && *g == 0.0 {
                    50.0
                } else if *l == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + g / l)
                }),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BollingerBandsValues {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    /// Band width as a percentage of the middle band
    pub width: Vec<Option<f64>>,
}

pub struct BollingerBands {
    pub period: usize,
    pub std_dev: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev: f64) -> Self {
        BollingerBands { period, std_dev }
    }

    pub fn calculate_detailed(&self, candles: &[Candle]) -> BollingerBandsValues {
        let values = closes(candles);
        let middle = rolling(&values, self.period, mean);
        // Population standard deviation
        let std = rolling(&values, self.period, |slice| {
            let m = mean(slice)?;
            let variance = slice.iter().map(|v| (v - m).powi(2)).sum::<f64>() / slice.len() as f64;
            Some(variance.sqrt())
        });

        let mut upper = Vec::with_capacity(values.len());
        let mut lower = Vec::with_capacity(values.len());
        let mut width = Vec::with_capacity(values.len());
        for (m, s) in middle.iter().zip(std.iter()) {
            match (m, s) {
                (Some(m), Some(s)) => {
                    let high = m + self.std_dev * s;
                    let low = m - self.std_dev * s;
                    upper.push(Some(high));
                    lower.push(Some(low));
                    width.push(if *m != 0.0 {
                        Some((high - low) / m * 100.0)
                    } else {
                        None
                    });
                }
                _ => {
                    upper.push(None);
                    lower.push(None);
                    width.push(None);
                }
            }
        }

        BollingerBandsValues {
            upper,
            middle,
            lower,
            width,
        }
    }
}

impl Indicator for BollingerBands {
    /// Middle band
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_detailed(candles).middle
    }
}

#[derive(Debug, Clone)]
pub struct MacdValues {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub diff: Vec<Option<f64>>,
}

pub struct MACD {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl MACD {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        MACD {
            fast_period,
            slow_period,
            signal_period,
        }
    }

    pub fn calculate_detailed(&self, candles: &[Candle]) -> MacdValues {
        let fast = EMA::new(self.fast_period).calculate(candles);
        let slow = EMA::new(self.slow_period).calculate(candles);

        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();

        let signal = EMA::new(self.signal_period).calculate_on_values(&macd);

        let diff = macd
            .iter()
            .zip(signal.iter())
            .map(|(m, s)| match (m, s) {
                (Some(m), Some(s)) => Some(m - s),
                _ => None,
            })
            .collect();

        MacdValues { macd, signal, diff }
    }
}

impl Indicator for MACD {
    /// MACD line
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_detailed(candles).macd
    }
}

#[derive(Debug, Clone)]
pub struct StochasticValues {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

pub struct StochasticOscillator {
    pub k_period: usize,
    pub d_period: usize,
}

impl StochasticOscillator {
    pub fn new(k_period: usize, d_period: usize) -> Self {
        StochasticOscillator { k_period, d_period }
    }

    pub fn calculate_detailed(&self, candles: &[Candle]) -> StochasticValues {
        let mut k = Vec::with_capacity(candles.len());

        for i in 0..candles.len() {
            if self.k_period == 0 || i + 1 < self.k_period {
                k.push(None);
                continue;
            }
            let slice = &candles[i + 1 - self.k_period..=i];
            let highest = slice
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);
            let lowest = slice.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

            // Flat window: %K is undefined
            let range = highest - lowest;
            k.push(if range > f64::EPSILON {
                Some(100.0 * (candles[i].close - lowest) / range)
            } else {
                None
            });
        }

        let d = rolling(&k, self.d_period, mean);

        StochasticValues { k, d }
    }
}

impl Indicator for StochasticOscillator {
    /// %D signal line
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_detailed(candles).d
    }
}

/// Indicator columns attached to each candle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorValues {
    pub bb_bbm: Option<f64>,
    pub bb_bbh: Option<f64>,
    pub bb_bbl: Option<f64>,
    pub bb_bbw: Option<f64>,
    pub sma_14: Option<f64>,
    pub ema_14: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_diff: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedCandle {
    #[serde(flatten)]
    pub candle: Candle,
    #[serde(flatten)]
    pub indicators: IndicatorValues,
}

/// Attach the fixed indicator set to a candle series.
///
/// Rows with non-finite OHLCV values are dropped first; after that the
/// output has exactly one row per remaining candle, in the same order.
pub fn enrich(series: &[Candle]) -> Vec<EnrichedCandle> {
    let candles: Vec<Candle> = series.iter().filter(|c| c.is_finite()).cloned().collect();

    let bands = BollingerBands::new(20, 2.0).calculate_detailed(&candles);
    let sma = SMA::new(14).calculate(&candles);
    let ema = EMA::new(14).calculate(&candles);
    let rsi = RSI::new(14).calculate(&candles);
    let macd = MACD::new(12, 26, 9).calculate_detailed(&candles);
    let stoch = StochasticOscillator::new(14, 3).calculate_detailed(&candles);

    candles
        .into_iter()
        .enumerate()
        .map(|(i, candle)| EnrichedCandle {
            candle,
            indicators: IndicatorValues {
                bb_bbm: bands.middle[i],
                bb_bbh: bands.upper[i],
                bb_bbl: bands.lower[i],
                bb_bbw: bands.width[i],
                sma_14: sma[i],
                ema_14: ema[i],
                rsi_14: rsi[i],
                macd: macd.macd[i],
                macd_signal: macd.signal[i],
                macd_diff: macd.diff[i],
                stoch_k: stoch.k[i],
                stoch_d: stoch.d[i],
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn series(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(
                    start + Duration::hours(i as i64),
                    c,
                    c + 1.0,
                    c - 1.0,
                    c,
                    1000.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_sma_warmup_and_value() {
        let candles = series(&[1.0, 2.0, 3.0, 4.0]);
        let values = SMA::new(3).calculate(&candles);
        assert_eq!(values, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let candles = series(&[10.0, 10.0, 10.0, 20.0]);
        let values = EMA::new(3).calculate(&candles);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(10.0));
        // alpha = 0.5
        assert_eq!(values[3], Some(15.0));
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let values = RSI::new(14).calculate(&series(&rising));
        assert_eq!(values.len(), 30);
        assert!(values[..13].iter().all(|v| v.is_none()));
        assert_eq!(values[29], Some(100.0));

        let mixed: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 102.0 })
            .collect();
        let values = RSI::new(14).calculate(&series(&mixed));
        let last = values[29].unwrap();
        assert!(last > 0.0 && last < 100.0);
    }

    #[test]
    fn test_bollinger_flat_series() {
        let candles = series(&[50.0; 25]);
        let bands = BollingerBands::new(20, 2.0).calculate_detailed(&candles);
        assert!(bands.middle[18].is_none());
        assert_eq!(bands.middle[19], Some(50.0));
        assert_eq!(bands.upper[24], Some(50.0));
        assert_eq!(bands.lower[24], Some(50.0));
        assert_eq!(bands.width[24], Some(0.0));
    }

    #[test]
    fn test_macd_needs_slow_and_signal_history() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).sin()).collect();
        let values = MACD::new(12, 26, 9).calculate_detailed(&series(&closes));
        assert!(values.macd[24].is_none());
        assert!(values.macd[25].is_some());
        assert!(values.signal[32].is_none());
        assert!(values.signal[33].is_some());
        let diff = values.diff[39].unwrap();
        let expected = values.macd[39].unwrap() - values.signal[39].unwrap();
        assert!((diff - expected).abs() < 1e-12);
    }

    #[test]
    fn test_stochastic_flat_window_is_undefined() {
        let mut candles = series(&[10.0; 16]);
        for c in candles.iter_mut() {
            c.high = 10.0;
            c.low = 10.0;
        }
        let values = StochasticOscillator::new(14, 3).calculate_detailed(&candles);
        assert!(values.k.iter().all(|k| k.is_none()));
        assert!(values.d.iter().all(|d| d.is_none()));
    }

    #[test]
    fn test_enrich_preserves_rows_and_order() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = series(&closes);
        let enriched = enrich(&candles);

        assert_eq!(enriched.len(), candles.len());
        for (row, candle) in enriched.iter().zip(candles.iter()) {
            assert_eq!(&row.candle, candle);
        }
        assert!(enriched[12].indicators.sma_14.is_none());
        assert!(enriched[13].indicators.sma_14.is_some());
        assert!(enriched[19].indicators.bb_bbm.is_some());
        // 30 daily rows never reach the MACD signal window
        assert!(enriched[29].indicators.macd_signal.is_none());
    }

    #[test]
    fn test_enrich_drops_non_finite_rows() {
        let mut candles = series(&[1.0, 2.0, 3.0]);
        candles[1].close = f64::NAN;
        let enriched = enrich(&candles);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[1].candle.close, 3.0);
    }

    #[test]
    fn test_enrich_empty_series() {
        assert!(enrich(&[]).is_empty());
    }

    #[test]
    fn test_enriched_candle_serializes_flat() {
        let enriched = enrich(&series(&[1.0]));
        let json = serde_json::to_value(&enriched[0]).unwrap();
        assert_eq!(json["close"], 1.0);
        assert!(json["rsi_14"].is_null());
    }
}
