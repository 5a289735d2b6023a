//! 基礎週期 K 線序列
//!
//! 序列只允許由單一寫入者追加，讀取方通過共享引用借用；
//! 重採樣與指標計算都不會修改序列本身。

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::SeriesConfig;
use crate::domain_types::candle::Candle;
use crate::domain_types::error::{CandleError, CandleResult, Discontinuity};
use crate::domain_types::frequency::Frequency;
use crate::monitor::{EngineMetrics, MetricType};

/// 單次補齊缺口時允許插入的合成 K 線數量上限（預設一天的分鐘數）
pub const DEFAULT_MAX_BACKFILL_BARS: usize = 1440;

/// 遇到不連續 K 線時的處理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// 丟棄該 K 線，序列保持不變（記錄日誌與指標）
    #[default]
    Drop,
    /// 返回錯誤，由調用方決定如何處理
    Reject,
    /// 以前一根收盤價插入平盤 K 線補齊缺口後再追加
    Backfill,
}

/// 單次追加的結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// 序列為空，插入第一根
    Inserted,
    /// 與最後一根開盤時間相同，替換最後一根（K 線仍在形成中）
    Refreshed,
    /// 緊接最後一根，追加為新 K 線
    Appended,
    /// 先插入 `synthetic` 根合成 K 線，再追加
    Backfilled { synthetic: usize },
    /// 不連續，K 線被丟棄
    Dropped(Discontinuity),
}

impl AppendOutcome {
    /// 用於日誌與監控標籤的名稱
    pub fn label(&self) -> &'static str {
        match self {
            AppendOutcome::Inserted => "inserted",
            AppendOutcome::Refreshed => "refreshed",
            AppendOutcome::Appended => "appended",
            AppendOutcome::Backfilled { .. } => "backfilled",
            AppendOutcome::Dropped(_) => "dropped",
        }
    }

    /// K 線是否進入了序列
    pub fn is_accepted(&self) -> bool {
        !matches!(self, AppendOutcome::Dropped(_))
    }
}

/// 追加統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendStats {
    pub inserted: usize,
    pub refreshed: usize,
    pub appended: usize,
    /// 插入的合成 K 線總數
    pub backfilled: usize,
    pub dropped: usize,
    pub rejected: usize,
}

impl AppendStats {
    fn record(&mut self, outcome: &AppendOutcome) {
        match outcome {
            AppendOutcome::Inserted => self.inserted += 1,
            AppendOutcome::Refreshed => self.refreshed += 1,
            AppendOutcome::Appended => self.appended += 1,
            AppendOutcome::Backfilled { synthetic } => {
                self.backfilled += synthetic;
                self.appended += 1;
            }
            AppendOutcome::Dropped(_) => self.dropped += 1,
        }
    }

    /// 被丟棄或拒絕的 K 線數量
    pub fn discontinuities(&self) -> usize {
        self.dropped + self.rejected
    }
}

/// 按開盤時間升序排列的基礎週期 K 線序列
#[derive(Debug, Clone)]
pub struct CandleSeries {
    base_resolution: Duration,
    gap_policy: GapPolicy,
    max_backfill_bars: usize,
    candles: Vec<Candle>,
    stats: AppendStats,
}

impl CandleSeries {
    /// 創建空序列，基礎週期必須為正的整數毫秒
    pub fn new(base_resolution: Duration) -> CandleResult<Self> {
        let millis = base_resolution.num_milliseconds();
        if millis <= 0 || Duration::milliseconds(millis) != base_resolution {
            return Err(CandleError::InvalidArgument(format!(
                "基礎週期必須為正的整數毫秒，實際為 {}",
                base_resolution
            )));
        }

        Ok(Self::with_resolution(base_resolution))
    }

    /// 以交易所週期創建空序列
    pub fn with_frequency(frequency: Frequency) -> Self {
        Self::with_resolution(frequency.to_duration())
    }

    /// 根據配置創建空序列
    pub fn from_config(config: &SeriesConfig) -> Self {
        Self::with_frequency(config.base_interval)
            .with_gap_policy(config.gap_policy)
            .with_max_backfill_bars(config.max_backfill_bars)
    }

    /// 以歷史數據預先填充序列，使用預設的丟棄策略
    pub fn from_candles<I>(base_resolution: Duration, candles: I) -> CandleResult<Self>
    where
        I: IntoIterator<Item = Candle>,
    {
        let mut series = Self::new(base_resolution)?;
        series.append_all(candles)?;
        Ok(series)
    }

    fn with_resolution(base_resolution: Duration) -> Self {
        Self {
            base_resolution,
            gap_policy: GapPolicy::default(),
            max_backfill_bars: DEFAULT_MAX_BACKFILL_BARS,
            candles: Vec::new(),
            stats: AppendStats::default(),
        }
    }

    /// 設置不連續處理策略
    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    /// 設置單次補齊缺口的上限
    pub fn with_max_backfill_bars(mut self, max_backfill_bars: usize) -> Self {
        self.max_backfill_bars = max_backfill_bars;
        self
    }

    /// 追加一根 K 線
    ///
    /// - 序列為空時直接插入；
    /// - 開盤時間與最後一根相同時替換最後一根；
    /// - 開盤時間等於最後一根收盤時間加一毫秒時追加；
    /// - 其餘情況按 [`GapPolicy`] 處理。
    pub fn append(&mut self, candle: Candle) -> CandleResult<AppendOutcome> {
        let last = self
            .candles
            .last()
            .map(|last| (last.open_time, last.next_open_time(), last.close_price));

        let outcome = match last {
            None => {
                self.candles.push(candle);
                AppendOutcome::Inserted
            }
            Some((last_open, _, _)) if candle.open_time == last_open => {
                let index = self.candles.len() - 1;
                self.candles[index] = candle;
                AppendOutcome::Refreshed
            }
            Some((_, expected, _)) if candle.open_time == expected => {
                self.candles.push(candle);
                AppendOutcome::Appended
            }
            Some((last_open, expected, last_close)) => {
                let discontinuity = if candle.open_time > expected {
                    Discontinuity::Gap {
                        expected,
                        actual: candle.open_time,
                    }
                } else {
                    Discontinuity::OutOfOrder {
                        last_open,
                        actual: candle.open_time,
                    }
                };
                self.handle_discontinuity(candle, discontinuity, last_close)?
            }
        };

        trace!(outcome = outcome.label(), len = self.candles.len(), "K 線寫入序列");
        self.stats.record(&outcome);
        EngineMetrics::record(MetricType::Append { outcome: outcome.label() }, None);

        Ok(outcome)
    }

    /// 依序追加多根 K 線，返回本批次的統計
    ///
    /// 在 [`GapPolicy::Reject`] 下遇到第一根不連續的 K 線即返回錯誤，
    /// 之前已追加的 K 線會保留在序列中。
    pub fn append_all<I>(&mut self, candles: I) -> CandleResult<AppendStats>
    where
        I: IntoIterator<Item = Candle>,
    {
        let mut batch = AppendStats::default();
        for candle in candles {
            let outcome = self.append(candle)?;
            batch.record(&outcome);
        }
        Ok(batch)
    }

    fn handle_discontinuity(
        &mut self,
        candle: Candle,
        discontinuity: Discontinuity,
        last_close: Decimal,
    ) -> CandleResult<AppendOutcome> {
        EngineMetrics::record(
            MetricType::Discontinuity {
                kind: discontinuity.kind(),
            },
            None,
        );

        match self.gap_policy {
            GapPolicy::Reject => {
                warn!(kind = discontinuity.kind(), %discontinuity, "拒絕不連續的 K 線");
                self.stats.rejected += 1;
                Err(CandleError::Discontinuous(discontinuity))
            }
            GapPolicy::Backfill => match discontinuity {
                Discontinuity::Gap { expected, actual } => {
                    match self.missing_bars(expected, actual) {
                        Some(missing) => Ok(self.backfill(candle, expected, missing, last_close)),
                        None => Ok(self.drop_candle(discontinuity)),
                    }
                }
                Discontinuity::OutOfOrder { .. } => Ok(self.drop_candle(discontinuity)),
            },
            GapPolicy::Drop => Ok(self.drop_candle(discontinuity)),
        }
    }

    fn drop_candle(&self, discontinuity: Discontinuity) -> AppendOutcome {
        warn!(
            kind = discontinuity.kind(),
            %discontinuity,
            len = self.candles.len(),
            "丟棄不連續的 K 線"
        );
        AppendOutcome::Dropped(discontinuity)
    }

    /// 計算缺口中缺少的基礎週期 K 線數量，無法補齊時返回 None
    fn missing_bars(&self, expected: DateTime<Utc>, actual: DateTime<Utc>) -> Option<usize> {
        let gap_ms = (actual - expected).num_milliseconds();
        let base_ms = self.base_resolution.num_milliseconds();
        if gap_ms <= 0 || gap_ms % base_ms != 0 {
            return None;
        }

        let missing = usize::try_from(gap_ms / base_ms).ok()?;
        (missing <= self.max_backfill_bars).then_some(missing)
    }

    fn backfill(
        &mut self,
        candle: Candle,
        expected: DateTime<Utc>,
        missing: usize,
        price: Decimal,
    ) -> AppendOutcome {
        self.candles.reserve(missing + 1);

        let mut open_time = expected;
        for _ in 0..missing {
            self.candles
                .push(Candle::synthetic(open_time, self.base_resolution, price));
            open_time = open_time + self.base_resolution;
        }
        self.candles.push(candle);

        debug!(synthetic = missing, from = %expected, "以合成 K 線補齊缺口");
        EngineMetrics::record(MetricType::Backfill { count: missing }, None);

        AppendOutcome::Backfilled { synthetic: missing }
    }

    /// 獲取 K 線數量
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// 檢查是否為空
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 按索引讀取 K 線
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// 按索引讀取 K 線，越界時返回錯誤
    pub fn at(&self, index: usize) -> CandleResult<&Candle> {
        self.candles.get(index).ok_or(CandleError::OutOfRange {
            start: index,
            end: index.saturating_add(1),
            len: self.candles.len(),
        })
    }

    /// 讀取 `[start, end)` 範圍的 K 線
    pub fn slice(&self, start: usize, end: usize) -> CandleResult<&[Candle]> {
        if start > end || end > self.candles.len() {
            return Err(CandleError::OutOfRange {
                start,
                end,
                len: self.candles.len(),
            });
        }
        Ok(&self.candles[start..end])
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// 全部 K 線
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    /// 取出全部 K 線
    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    /// 獲取收盤價數組
    pub fn close_prices(&self) -> Vec<Decimal> {
        self.candles.iter().map(|candle| candle.close_price).collect()
    }

    pub fn base_resolution(&self) -> Duration {
        self.base_resolution
    }

    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }

    pub fn max_backfill_bars(&self) -> usize {
        self.max_backfill_bars
    }

    /// 累計的追加統計
    pub fn stats(&self) -> AppendStats {
        self.stats
    }

    /// 以已合併好的 K 線直接構造衍生序列，不經過連續性檢查
    pub(crate) fn derived(
        base_resolution: Duration,
        gap_policy: GapPolicy,
        max_backfill_bars: usize,
        candles: Vec<Candle>,
    ) -> Self {
        Self {
            base_resolution,
            gap_policy,
            max_backfill_bars,
            candles,
            stats: AppendStats::default(),
        }
    }
}

impl AsRef<[Candle]> for CandleSeries {
    fn as_ref(&self) -> &[Candle] {
        &self.candles
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
