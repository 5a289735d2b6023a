use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain_types::error::{CandleError, CandleResult};

/// 時間的最小單位（交易所 K 線以毫秒計時）
pub fn time_unit() -> Duration {
    Duration::milliseconds(1)
}

/// K 線數據結構
///
/// 對應交易所 kline 的全部欄位。`close_time` 為區間內最後一毫秒，
/// 即 `close_time == open_time + duration - 1ms`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub volume: Decimal,
    pub quote_asset_volume: Decimal,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: Decimal,
    pub taker_buy_quote_asset_volume: Decimal,
    pub ignore: Decimal,
}

impl Candle {
    /// 創建新的 K 線，成交額相關欄位預設為零
    pub fn new(
        open_time: DateTime<Utc>,
        duration: Duration,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            open_time,
            close_time: open_time + duration - time_unit(),
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            volume,
            quote_asset_volume: Decimal::ZERO,
            number_of_trades: 0,
            taker_buy_base_asset_volume: Decimal::ZERO,
            taker_buy_quote_asset_volume: Decimal::ZERO,
            ignore: Decimal::ZERO,
        }
    }

    /// 創建一根沒有成交的平盤 K 線，用於補齊缺口
    pub fn synthetic(open_time: DateTime<Utc>, duration: Duration, price: Decimal) -> Self {
        Self::new(open_time, duration, price, price, price, price, Decimal::ZERO)
    }

    /// 設置成交額欄位
    pub fn with_quote_volumes(
        mut self,
        quote_asset_volume: Decimal,
        taker_buy_base_asset_volume: Decimal,
        taker_buy_quote_asset_volume: Decimal,
    ) -> Self {
        self.quote_asset_volume = quote_asset_volume;
        self.taker_buy_base_asset_volume = taker_buy_base_asset_volume;
        self.taker_buy_quote_asset_volume = taker_buy_quote_asset_volume;
        self
    }

    /// 設置成交筆數
    pub fn with_trades(mut self, number_of_trades: u64) -> Self {
        self.number_of_trades = number_of_trades;
        self
    }

    /// K 線涵蓋的時間長度
    pub fn duration(&self) -> Duration {
        self.close_time - self.open_time + time_unit()
    }

    /// 緊接在本 K 線之後的下一根 K 線的開盤時間
    pub fn next_open_time(&self) -> DateTime<Utc> {
        self.close_time + time_unit()
    }

    /// 檢查 OHLC 價格關係是否成立
    ///
    /// 計算核心不會主動拒絕不一致的數據，此方法供調用方或測試使用。
    pub fn is_consistent(&self) -> bool {
        self.low_price <= self.open_price.min(self.close_price)
            && self.high_price >= self.open_price.max(self.close_price)
    }

    /// 將同一週期、按時間排序的連續 K 線合併成一根較大週期的 K 線
    ///
    /// 開盤取第一根、收盤取最後一根、最高最低取極值，成交量與成交筆數累加。
    pub fn merge(candles: &[Candle]) -> CandleResult<Candle> {
        let (first, rest) = candles.split_first().ok_or(CandleError::EmptyMerge)?;

        let mut merged = first.clone();
        for candle in rest {
            merged.close_time = candle.close_time;
            merged.close_price = candle.close_price;
            merged.high_price = merged.high_price.max(candle.high_price);
            merged.low_price = merged.low_price.min(candle.low_price);
            merged.volume = checked_sum(merged.volume, candle.volume, "volume")?;
            merged.quote_asset_volume = checked_sum(
                merged.quote_asset_volume,
                candle.quote_asset_volume,
                "quote_asset_volume",
            )?;
            merged.number_of_trades = merged
                .number_of_trades
                .checked_add(candle.number_of_trades)
                .ok_or_else(|| overflow("number_of_trades"))?;
            merged.taker_buy_base_asset_volume = checked_sum(
                merged.taker_buy_base_asset_volume,
                candle.taker_buy_base_asset_volume,
                "taker_buy_base_asset_volume",
            )?;
            merged.taker_buy_quote_asset_volume = checked_sum(
                merged.taker_buy_quote_asset_volume,
                candle.taker_buy_quote_asset_volume,
                "taker_buy_quote_asset_volume",
            )?;
            merged.ignore = checked_sum(merged.ignore, candle.ignore, "ignore")?;
        }

        Ok(merged)
    }
}

fn overflow(field: &str) -> CandleError {
    CandleError::InvalidArgument(format!("合併後 {} 超出可表示範圍", field))
}

fn checked_sum(total: Decimal, value: Decimal, field: &str) -> CandleResult<Decimal> {
    total.checked_add(value).ok_or_else(|| overflow(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn minute_candle(minute: u32, close: Decimal, volume: Decimal) -> Candle {
        let open_time = Utc.with_ymd_and_hms(2023, 1, 1, 0, minute, 0).unwrap();
        Candle::new(
            open_time,
            Duration::minutes(1),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            volume,
        )
    }

    #[test]
    fn test_candle_creation() {
        let candle = minute_candle(0, dec!(100), dec!(5));

        assert_eq!(candle.duration(), Duration::minutes(1));
        assert_eq!(
            candle.close_time,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 59).unwrap() + Duration::milliseconds(999)
        );
        assert_eq!(
            candle.next_open_time(),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 1, 0).unwrap()
        );
        assert!(candle.is_consistent());
    }

    #[test]
    fn test_merge_three_minutes() {
        let candles = vec![
            minute_candle(0, dec!(10), dec!(1)).with_trades(3),
            minute_candle(1, dec!(12), dec!(2)).with_trades(4),
            minute_candle(2, dec!(11), dec!(3)).with_trades(5),
        ];

        let merged = Candle::merge(&candles).unwrap();

        assert_eq!(merged.open_time, candles[0].open_time);
        assert_eq!(merged.close_time, candles[2].close_time);
        assert_eq!(merged.duration(), Duration::minutes(3));
        assert_eq!(merged.open_price, dec!(10));
        assert_eq!(merged.close_price, dec!(11));
        assert_eq!(merged.high_price, dec!(13));
        assert_eq!(merged.low_price, dec!(9));
        assert_eq!(merged.volume, dec!(6));
        assert_eq!(merged.number_of_trades, 12);
    }

    #[test]
    fn test_merge_sums_quote_volumes() {
        let candles = vec![
            minute_candle(0, dec!(10), dec!(1)).with_quote_volumes(dec!(10.5), dec!(0.25), dec!(2.5)),
            minute_candle(1, dec!(10), dec!(1)).with_quote_volumes(dec!(0.5), dec!(0.75), dec!(7.5)),
        ];

        let merged = Candle::merge(&candles).unwrap();

        assert_eq!(merged.quote_asset_volume, dec!(11.0));
        assert_eq!(merged.taker_buy_base_asset_volume, dec!(1.00));
        assert_eq!(merged.taker_buy_quote_asset_volume, dec!(10.0));
    }

    #[test]
    fn test_merge_single_candle_is_identity() {
        let candle = minute_candle(7, dec!(42.5), dec!(0.1));
        assert_eq!(Candle::merge(std::slice::from_ref(&candle)).unwrap(), candle);
    }

    #[test]
    fn test_merge_empty_fails() {
        assert_eq!(Candle::merge(&[]), Err(CandleError::EmptyMerge));
    }

    #[test]
    fn test_merge_volume_overflow_is_error() {
        let candles = vec![
            minute_candle(0, dec!(10), Decimal::MAX),
            minute_candle(1, dec!(10), Decimal::MAX),
        ];
        assert_matches!(Candle::merge(&candles), Err(CandleError::InvalidArgument(_)));

        let trades = vec![
            minute_candle(0, dec!(10), dec!(1)).with_trades(u64::MAX),
            minute_candle(1, dec!(10), dec!(1)).with_trades(1),
        ];
        assert_matches!(Candle::merge(&trades), Err(CandleError::InvalidArgument(_)));
    }

    #[test]
    fn test_synthetic_candle_is_flat() {
        let open_time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let candle = Candle::synthetic(open_time, Duration::minutes(1), dec!(25.5));

        assert_eq!(candle.open_price, dec!(25.5));
        assert_eq!(candle.high_price, dec!(25.5));
        assert_eq!(candle.low_price, dec!(25.5));
        assert_eq!(candle.close_price, dec!(25.5));
        assert_eq!(candle.volume, Decimal::ZERO);
        assert_eq!(candle.number_of_trades, 0);
    }
}
