//! 隨機指標（Stochastic Oscillator）
//!
//! 所有運算使用 `Decimal`，結果統一以銀行家捨入（round-half-even）
//! 保留 [`INDICATOR_SCALE`] 位小數，相同輸入必定得到相同輸出。

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::slice::Windows;
use std::time::Instant;

use crate::config::StochasticConfig;
use crate::domain_types::candle::Candle;
use crate::domain_types::error::{CandleError, CandleResult};
use crate::domain_types::series::CandleSeries;
use crate::monitor::EngineMetrics;

/// 指標結果保留的小數位數
pub const INDICATOR_SCALE: u32 = 8;

/// 分母的平滑項，避免價格完全持平時除以零
pub const STOCHASTIC_EPSILON: Decimal = dec!(0.00000001);

const HUNDRED: Decimal = dec!(100);

fn round_indicator(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(INDICATOR_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// 計算一個窗口的 %K
///
/// `100 * (最後收盤 - 最低收盤) / (最高收盤 - 最低收盤 + ε)`
///
/// 調用前須以 [`ensure_close_span`] 檢查過包含此窗口的切片。
fn fast_stochastic(window: &[Candle]) -> Decimal {
    let (Some(last), Some((min_close, max_close))) = (window.last(), close_range(window)) else {
        return Decimal::ZERO;
    };

    let numerator = last.close_price - min_close;
    let denominator = max_close - min_close + STOCHASTIC_EPSILON;

    // numerator < denominator，先除後乘時結果不會溢出
    let value = match numerator.checked_mul(HUNDRED) {
        Some(scaled) => scaled / denominator,
        None => numerator / denominator * HUNDRED,
    };
    round_indicator(value)
}

fn close_range(candles: &[Candle]) -> Option<(Decimal, Decimal)> {
    let first = candles.first()?.close_price;
    Some(candles.iter().fold((first, first), |(min, max), candle| {
        (min.min(candle.close_price), max.max(candle.close_price))
    }))
}

/// 收盤價跨度加上 ε 必須仍在 `Decimal` 可表示範圍內
fn ensure_close_span(candles: &[Candle]) -> CandleResult<()> {
    let Some((min_close, max_close)) = close_range(candles) else {
        return Ok(());
    };

    max_close
        .checked_sub(min_close)
        .and_then(|span| span.checked_add(STOCHASTIC_EPSILON))
        .map(|_| ())
        .ok_or_else(|| {
            CandleError::InvalidArgument(format!(
                "收盤價跨度超出可表示範圍: {} 至 {}",
                min_close, max_close
            ))
        })
}

/// %D 需要的 K 線數量 `bar_count + smoothing_size - 1`
fn slow_required(bar_count: usize, smoothing_size: usize) -> usize {
    bar_count.saturating_add(smoothing_size.saturating_sub(1))
}

fn simple_average(sum: Decimal, count: usize) -> Decimal {
    round_indicator(sum / Decimal::from(count))
}

fn ensure_positive(value: usize, name: &str) -> CandleResult<()> {
    if value == 0 {
        return Err(CandleError::InvalidArgument(format!("{} 必須大於 0", name)));
    }
    Ok(())
}

/// 一次計算得到的 %K 與 %D
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StochasticSnapshot {
    pub fast: Decimal,
    pub slow: Decimal,
}

/// 隨機指標計算器，只借用 K 線數據
#[derive(Debug, Clone, Copy)]
pub struct StochasticEngine<'a> {
    candles: &'a [Candle],
}

impl<'a> StochasticEngine<'a> {
    pub fn new(candles: &'a [Candle]) -> Self {
        Self { candles }
    }

    /// 最近 `bar_count` 根 K 線的 %K
    pub fn fast_value(&self, bar_count: usize) -> CandleResult<Decimal> {
        ensure_positive(bar_count, "bar_count")?;
        let len = self.candles.len();
        if bar_count > len {
            return Err(CandleError::InsufficientData {
                required: bar_count,
                available: len,
            });
        }

        let window = &self.candles[len - bar_count..];
        ensure_close_span(window)?;
        Ok(fast_stochastic(window))
    }

    /// 每一個窗口起點的 %K 序列，共 `len - bar_count + 1` 個
    ///
    /// 返回的迭代器是惰性的，可以複製後重新遍歷。
    pub fn fast_series(&self, bar_count: usize) -> CandleResult<FastStochastic<'a>> {
        ensure_positive(bar_count, "bar_count")?;
        if bar_count > self.candles.len() {
            return Err(CandleError::InsufficientData {
                required: bar_count,
                available: self.candles.len(),
            });
        }
        ensure_close_span(self.candles)?;

        Ok(FastStochastic {
            windows: self.candles.windows(bar_count),
        })
    }

    /// 最近 `smoothing_size` 個 %K 的簡單移動平均（%D）
    ///
    /// 只計算最後 `smoothing_size` 個窗口，與序列長度無關。
    pub fn slow_value(&self, bar_count: usize, smoothing_size: usize) -> CandleResult<Decimal> {
        ensure_positive(bar_count, "bar_count")?;
        ensure_positive(smoothing_size, "smoothing_size")?;
        let len = self.candles.len();
        let required = slow_required(bar_count, smoothing_size);
        if required > len {
            return Err(CandleError::InsufficientData {
                required,
                available: len,
            });
        }

        let tail = StochasticEngine::new(&self.candles[len - required..]);
        let sum: Decimal = tail.fast_series(bar_count)?.sum();
        Ok(simple_average(sum, smoothing_size))
    }

    /// %D 序列，共 `fast_len - smoothing_size + 1` 個
    pub fn slow_series(
        &self,
        bar_count: usize,
        smoothing_size: usize,
    ) -> CandleResult<SlowStochastic<'a>> {
        ensure_positive(smoothing_size, "smoothing_size")?;
        let fast = self.fast_series(bar_count)?;
        if smoothing_size > fast.len() {
            return Err(CandleError::InsufficientData {
                required: slow_required(bar_count, smoothing_size),
                available: self.candles.len(),
            });
        }

        Ok(SlowStochastic {
            fast,
            smoothing_size,
            window: VecDeque::with_capacity(smoothing_size),
            sum: Decimal::ZERO,
        })
    }

    /// 按配置同時計算 %K 與 %D
    pub fn snapshot(&self, config: &StochasticConfig) -> CandleResult<StochasticSnapshot> {
        let started = Instant::now();
        let snapshot = StochasticSnapshot {
            fast: self.fast_value(config.bar_count)?,
            slow: self.slow_value(config.bar_count, config.smoothing_size)?,
        };
        EngineMetrics::record_latency("stochastic", started.elapsed());

        Ok(snapshot)
    }
}

/// %K 序列迭代器
#[derive(Debug, Clone)]
pub struct FastStochastic<'a> {
    windows: Windows<'a, Candle>,
}

impl Iterator for FastStochastic<'_> {
    type Item = Decimal;

    fn next(&mut self) -> Option<Decimal> {
        self.windows.next().map(fast_stochastic)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }

    fn nth(&mut self, n: usize) -> Option<Decimal> {
        self.windows.nth(n).map(fast_stochastic)
    }

    fn last(mut self) -> Option<Decimal> {
        self.windows.next_back().map(fast_stochastic)
    }
}

impl ExactSizeIterator for FastStochastic<'_> {}

impl FusedIterator for FastStochastic<'_> {}

/// %D 序列迭代器，以滾動總和計算移動平均
#[derive(Debug, Clone)]
pub struct SlowStochastic<'a> {
    fast: FastStochastic<'a>,
    smoothing_size: usize,
    window: VecDeque<Decimal>,
    sum: Decimal,
}

impl Iterator for SlowStochastic<'_> {
    type Item = Decimal;

    fn next(&mut self) -> Option<Decimal> {
        while self.window.len() < self.smoothing_size {
            let value = self.fast.next()?;
            self.sum += value;
            self.window.push_back(value);
        }

        let average = simple_average(self.sum, self.smoothing_size);
        if let Some(oldest) = self.window.pop_front() {
            self.sum -= oldest;
        }
        Some(average)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = self.window.len() + self.fast.len();
        let remaining = (buffered + 1).saturating_sub(self.smoothing_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlowStochastic<'_> {}

impl FusedIterator for SlowStochastic<'_> {}

/// 為 K 線數據添加技術指標功能的擴展 trait
pub trait IndicatorsExt {
    /// 隨機指標計算器
    fn stochastic(&self) -> StochasticEngine<'_>;
}

impl IndicatorsExt for [Candle] {
    fn stochastic(&self) -> StochasticEngine<'_> {
        StochasticEngine::new(self)
    }
}

impl IndicatorsExt for CandleSeries {
    fn stochastic(&self) -> StochasticEngine<'_> {
        StochasticEngine::new(self.candles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    fn candles_with_closes(closes: &[Decimal]) -> Vec<Candle> {
        let base_time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                Candle::new(
                    base_time + Duration::minutes(i as i64),
                    Duration::minutes(1),
                    *close,
                    *close,
                    *close,
                    *close,
                    dec!(1),
                )
            })
            .collect()
    }

    #[test]
    fn test_fast_value_scenario() {
        let candles = candles_with_closes(&[dec!(10), dec!(12), dec!(11), dec!(15), dec!(14)]);

        let k = candles.stochastic().fast_value(3).unwrap();

        // 100 * 3 / 4.00000001
        assert_eq!(k, dec!(74.99999981));
        assert!((k - dec!(75)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_flat_window_is_zero() {
        let candles = candles_with_closes(&[dec!(7), dec!(7), dec!(7)]);
        assert_eq!(candles.stochastic().fast_value(3).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_fast_value_insufficient_data() {
        let candles = candles_with_closes(&[dec!(1), dec!(2)]);
        let result = candles.stochastic().fast_value(3);
        assert_eq!(result, Err(CandleError::InsufficientData { required: 3, available: 2 }));
        assert!(result.unwrap_err().is_insufficient_data());
    }

    #[test]
    fn test_zero_bar_count_is_invalid() {
        let candles = candles_with_closes(&[dec!(1), dec!(2)]);
        assert_matches!(candles.stochastic().fast_value(0), Err(CandleError::InvalidArgument(_)));
        assert_matches!(candles.stochastic().fast_series(0), Err(CandleError::InvalidArgument(_)));
        assert_matches!(candles.stochastic().slow_value(1, 0), Err(CandleError::InvalidArgument(_)));
    }

    #[test]
    fn test_fast_series_values() {
        let candles = candles_with_closes(&[dec!(10), dec!(12), dec!(11), dec!(15), dec!(14)]);
        let series = candles.stochastic().fast_series(3).unwrap();

        assert_eq!(series.len(), 3);
        let values: Vec<Decimal> = series.clone().collect();

        // [10, 12, 11]: 100 * 1 / 2.00000001
        assert_eq!(values[0], round_indicator(dec!(100) / dec!(2.00000001)));
        // [12, 11, 15]: 最後收盤即最高價
        assert_eq!(values[1], round_indicator(dec!(400) / dec!(4.00000001)));
        assert_eq!(values[2], dec!(74.99999981));

        // 迭代器可重新遍歷
        assert_eq!(series.collect::<Vec<_>>(), values);
    }

    #[test]
    fn test_slow_value_matches_series_tail() {
        let closes: Vec<Decimal> = [3, 5, 4, 8, 7, 9, 6, 10, 12, 11]
            .iter()
            .map(|v| Decimal::from(*v))
            .collect();
        let candles = candles_with_closes(&closes);
        let engine = candles.stochastic();

        let slow: Vec<Decimal> = engine.slow_series(4, 3).unwrap().collect();

        assert_eq!(slow.len(), 10 - 4 + 1 - 3 + 1);
        assert_eq!(*slow.last().unwrap(), engine.slow_value(4, 3).unwrap());

        let fast: Vec<Decimal> = engine.fast_series(4).unwrap().collect();
        let expected_first = round_indicator((fast[0] + fast[1] + fast[2]) / dec!(3));
        assert_eq!(slow[0], expected_first);
    }

    #[test]
    fn test_slow_series_size_hint() {
        let candles = candles_with_closes(&[dec!(1), dec!(3), dec!(2), dec!(5), dec!(4), dec!(6)]);
        let mut slow = candles.stochastic().slow_series(2, 2).unwrap();

        assert_eq!(slow.len(), 4);
        slow.next();
        assert_eq!(slow.len(), 3);
        assert_eq!(slow.by_ref().count(), 3);
        assert_eq!(slow.next(), None);
    }

    #[test]
    fn test_slow_value_insufficient_data() {
        let candles = candles_with_closes(&[dec!(1), dec!(2), dec!(3), dec!(4)]);
        let engine = candles.stochastic();

        assert_eq!(
            engine.slow_value(3, 3),
            Err(CandleError::InsufficientData { required: 5, available: 4 })
        );
        assert!(engine.slow_series(3, 3).unwrap_err().is_insufficient_data());
        assert!(engine.slow_value(3, 2).is_ok());
    }

    #[test]
    fn test_snapshot() {
        let candles = candles_with_closes(&[dec!(10), dec!(12), dec!(11), dec!(15), dec!(14)]);
        let config = StochasticConfig {
            bar_count: 3,
            smoothing_size: 2,
        };

        let snapshot = candles.stochastic().snapshot(&config).unwrap();

        assert_eq!(snapshot.fast, dec!(74.99999981));
        assert_eq!(snapshot.slow, candles.stochastic().slow_value(3, 2).unwrap());
    }

    #[test]
    fn test_huge_smoothing_size_reports_saturated_requirement() {
        let candles = candles_with_closes(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
        let engine = candles.stochastic();
        let expected = CandleError::InsufficientData {
            required: usize::MAX,
            available: 5,
        };

        assert_eq!(engine.slow_value(5, usize::MAX), Err(expected.clone()));
        assert_eq!(engine.slow_series(5, usize::MAX).unwrap_err(), expected);
        assert_eq!(
            engine.slow_value(usize::MAX, 2),
            Err(CandleError::InsufficientData { required: usize::MAX, available: 5 })
        );
    }

    #[test]
    fn test_fast_series_nth_and_last() {
        let closes: Vec<Decimal> = [3, 5, 4, 8, 7, 9, 6, 10, 12, 11]
            .iter()
            .map(|v| Decimal::from(*v))
            .collect();
        let candles = candles_with_closes(&closes);
        let series = candles.stochastic().fast_series(4).unwrap();
        let values: Vec<Decimal> = series.clone().collect();

        for (k, value) in values.iter().enumerate() {
            assert_eq!(series.clone().nth(k), Some(*value));
        }
        assert_eq!(series.clone().nth(values.len()), None);
        assert_eq!(series.clone().last(), values.last().copied());

        let mut skipped = series.clone();
        assert_eq!(skipped.nth(2), Some(values[2]));
        assert_eq!(skipped.len(), values.len() - 3);
        assert_eq!(skipped.next(), Some(values[3]));
    }

    #[test]
    fn test_slow_value_on_long_series_matches_tail() {
        let closes: Vec<Decimal> = (0..500).map(|i| Decimal::from((i * 37) % 101)).collect();
        let candles = candles_with_closes(&closes);
        let engine = candles.stochastic();

        let last_slow = engine.slow_series(20, 3).unwrap().last();

        assert_eq!(last_slow, Some(engine.slow_value(20, 3).unwrap()));
        assert_eq!(
            engine.slow_value(20, 3).unwrap(),
            candles[500 - 22..].stochastic().slow_value(20, 3).unwrap()
        );
    }

    #[test]
    fn test_unrepresentable_close_span_is_invalid() {
        let candles = candles_with_closes(&[Decimal::MIN, Decimal::MAX]);
        let engine = candles.stochastic();

        assert_matches!(engine.fast_value(2), Err(CandleError::InvalidArgument(_)));
        assert_matches!(engine.fast_series(2), Err(CandleError::InvalidArgument(_)));
        assert_matches!(engine.slow_value(2, 1), Err(CandleError::InvalidArgument(_)));
        assert_matches!(engine.slow_series(1, 2), Err(CandleError::InvalidArgument(_)));
        // 單根窗口的跨度為零
        assert_eq!(engine.fast_value(1), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_large_close_span_does_not_overflow() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let candles = candles_with_closes(&[Decimal::ZERO, huge / dec!(2), huge]);

        let k = candles.stochastic().fast_value(3).unwrap();
        let series: Vec<Decimal> = candles.stochastic().fast_series(2).unwrap().collect();

        assert!((k - dec!(100)).abs() < dec!(0.0001));
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|v| (*v - dec!(100)).abs() < dec!(0.0001)));
    }
}
