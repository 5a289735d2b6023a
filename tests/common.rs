#![allow(dead_code)]

use candle_engine::domain_types::{Candle, CandleSeries};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// 以收盤價序列建立連續的一分鐘 K 線，開盤價等於前一根收盤價
pub fn minute_candles(closes: &[i64]) -> Vec<Candle> {
    let mut previous = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let open = Decimal::from(previous);
            previous = *close;
            let close = Decimal::from(*close);
            Candle::new(
                base_time() + Duration::minutes(i as i64),
                Duration::minutes(1),
                open,
                open.max(close) + Decimal::ONE,
                open.min(close) - Decimal::ONE,
                close,
                Decimal::from(i as i64 + 1),
            )
        })
        .collect()
}

pub fn minute_series(closes: &[i64]) -> CandleSeries {
    CandleSeries::from_candles(Duration::minutes(1), minute_candles(closes)).unwrap()
}

/// 長度為 `len` 的鋸齒價格序列
pub fn zigzag_closes(len: usize) -> Vec<i64> {
    (0..len as i64).map(|i| 100 + (i * 7) % 13 - (i % 5)).collect()
}
