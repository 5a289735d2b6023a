use chrono::{DateTime, Utc};
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

use crate::domain_types::candle::Candle;
use crate::domain_types::error::CandleError;
use crate::domain_types::series::{AppendStats, CandleSeries};

/// 數據加載錯誤
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("檔案讀取錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 解析錯誤: {0}")]
    Csv(#[from] csv::Error),

    #[error("第 {line} 行欄位數量錯誤: 預期 {expected}，實際 {actual}")]
    ColumnCount {
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("第 {line} 行時間戳無效: {value}")]
    InvalidTimestamp { line: u64, value: String },

    #[error("第 {line} 行欄位 {column} 的值無效: {value}")]
    InvalidField {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("K 線序列錯誤: {0}")]
    Candle(#[from] CandleError),
}

/// 歷史 K 線的讀取邊界
///
/// 實現者按 `open_time` 升序返回 K 線。
pub trait CandleLoader {
    /// 加載全部 K 線
    fn load(&self) -> Result<Vec<Candle>, LoaderError>;

    /// 加載 `open_time` 落在 `[start, end)` 的 K 線
    fn load_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, LoaderError> {
        let mut candles = self.load()?;
        candles.retain(|candle| candle.open_time >= start && candle.open_time < end);
        Ok(candles)
    }
}

impl CandleSeries {
    /// 從加載器填充序列，`range` 為 `None` 時加載全部
    ///
    /// 每根 K 線都經過 `append`，因此序列的缺口策略同樣生效。
    pub fn load_from<L>(
        &mut self,
        loader: &L,
        range: Option<Range<DateTime<Utc>>>,
    ) -> Result<AppendStats, LoaderError>
    where
        L: CandleLoader + ?Sized,
    {
        let candles = match range {
            Some(range) => loader.load_range(range.start, range.end)?,
            None => loader.load()?,
        };

        let loaded = candles.len();
        let stats = self.append_all(candles)?;
        debug!(loaded, series_len = self.len(), "歷史 K 線加載完成");

        Ok(stats)
    }
}
