use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// K 線序列的不連續情況
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discontinuity {
    /// 新 K 線的開盤時間晚於預期，中間缺少 K 線
    Gap {
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
    },
    /// 新 K 線的開盤時間早於預期，且不是對最後一根的更新
    OutOfOrder {
        last_open: DateTime<Utc>,
        actual: DateTime<Utc>,
    },
}

impl Discontinuity {
    /// 用於日誌與監控標籤的類型名稱
    pub fn kind(&self) -> &'static str {
        match self {
            Discontinuity::Gap { .. } => "gap",
            Discontinuity::OutOfOrder { .. } => "out_of_order",
        }
    }

    /// 觸發不連續的 K 線開盤時間
    pub fn actual(&self) -> DateTime<Utc> {
        match self {
            Discontinuity::Gap { actual, .. } | Discontinuity::OutOfOrder { actual, .. } => *actual,
        }
    }
}

impl fmt::Display for Discontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discontinuity::Gap { expected, actual } => write!(
                f,
                "預期開盤時間 {}，實際為 {}",
                expected.to_rfc3339(),
                actual.to_rfc3339()
            ),
            Discontinuity::OutOfOrder { last_open, actual } => write!(
                f,
                "開盤時間 {} 早於最後一根 K 線 {} 之後的位置",
                actual.to_rfc3339(),
                last_open.to_rfc3339()
            ),
        }
    }
}

/// K 線計算核心錯誤
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandleError {
    #[error("無法合併空的 K 線序列")]
    EmptyMerge,

    #[error("索引範圍越界: [{start}, {end}) 超出序列長度 {len}")]
    OutOfRange { start: usize, end: usize, len: usize },

    #[error("目標週期 {target_ms} 毫秒不是基礎週期 {base_ms} 毫秒的正整數倍")]
    NonMultipleDuration { target_ms: i64, base_ms: i64 },

    #[error("無效的參數: {0}")]
    InvalidArgument(String),

    #[error("數據不足: 需要 {required} 根，實際只有 {available} 根")]
    InsufficientData { required: usize, available: usize },

    #[error("K 線不連續: {0}")]
    Discontinuous(Discontinuity),
}

impl CandleError {
    /// 是否為調用方傳入了錯誤參數（修正參數後可重試）
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptyMerge
                | Self::OutOfRange { .. }
                | Self::NonMultipleDuration { .. }
                | Self::InvalidArgument(_)
        )
    }

    /// 是否為歷史數據不足（等待更多 K 線後可重試）
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type CandleResult<T> = Result<T, CandleError>;
