// resampler.rs
use chrono::Duration;
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::domain_types::candle::Candle;
use crate::domain_types::error::{CandleError, CandleResult};
use crate::domain_types::frequency::Frequency;
use crate::domain_types::series::CandleSeries;
use crate::monitor::EngineMetrics;

/// 提供重採樣核心功能的結構
///
/// 將基礎週期 K 線按固定數量分組合併成較大週期。分組從範圍的左端開始，
/// 最後不足一組的 K 線會被捨棄，不會產生不完整的大週期 K 線。
pub struct Resampler;

impl Resampler {
    /// 計算每個大週期 K 線包含的基礎 K 線數量
    ///
    /// 目標週期必須是基礎週期的正整數倍。
    pub fn bucket_size(base_resolution: Duration, target: Duration) -> CandleResult<usize> {
        let base_ms = base_resolution.num_milliseconds();
        let target_ms = target.num_milliseconds();

        if base_ms <= 0
            || target_ms <= 0
            || Duration::milliseconds(target_ms) != target
            || target_ms % base_ms != 0
        {
            return Err(CandleError::NonMultipleDuration { target_ms, base_ms });
        }

        usize::try_from(target_ms / base_ms)
            .map_err(|_| CandleError::NonMultipleDuration { target_ms, base_ms })
    }

    /// 對序列 `[0, end_exclusive)` 範圍進行重採樣
    ///
    /// 指定 `window_size` 時只返回最近的 `window_size` 根大週期 K 線，
    /// 即只使用以 `end_exclusive` 結尾的最後 `window_size * k` 根基礎 K 線。
    /// 返回的新序列與原序列互不影響。
    pub fn resample(
        series: &CandleSeries,
        target: Duration,
        end_exclusive: usize,
        window_size: Option<usize>,
    ) -> CandleResult<CandleSeries> {
        let started = Instant::now();
        let bucket = Self::bucket_size(series.base_resolution(), target)?;
        let source = series.slice(0, end_exclusive)?;

        let range = match window_size {
            Some(window) => {
                let required = window.checked_mul(bucket).ok_or_else(|| {
                    CandleError::InvalidArgument(format!("窗口大小 {} 過大", window))
                })?;
                if required > source.len() {
                    return Err(CandleError::InsufficientData {
                        required,
                        available: source.len(),
                    });
                }
                &source[source.len() - required..]
            }
            None => source,
        };

        let candles = if bucket == 1 {
            range.to_vec()
        } else {
            range
                .chunks_exact(bucket)
                .map(Candle::merge)
                .collect::<CandleResult<Vec<_>>>()?
        };

        debug!(
            bucket,
            source_len = range.len(),
            resampled_len = candles.len(),
            target_ms = target.num_milliseconds(),
            "重採樣完成"
        );
        EngineMetrics::record_latency("resample", started.elapsed());

        Ok(CandleSeries::derived(
            target,
            series.gap_policy(),
            series.max_backfill_bars(),
            candles,
        ))
    }

    /// 對整個序列進行重採樣
    pub fn resample_all(series: &CandleSeries, target: Duration) -> CandleResult<CandleSeries> {
        Self::resample(series, target, series.len(), None)
    }

    /// 以交易所週期重採樣
    pub fn resample_frequency(
        series: &CandleSeries,
        frequency: Frequency,
        end_exclusive: usize,
        window_size: Option<usize>,
    ) -> CandleResult<CandleSeries> {
        Self::resample(series, frequency.to_duration(), end_exclusive, window_size)
    }

    /// 並行計算多個目標週期的重採樣結果，順序與 `targets` 相同
    pub fn resample_many(
        series: &CandleSeries,
        targets: &[Duration],
    ) -> CandleResult<Vec<CandleSeries>> {
        targets
            .par_iter()
            .map(|target| Self::resample_all(series, *target))
            .collect()
    }
}
