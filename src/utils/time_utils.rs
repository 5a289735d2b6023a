// time_utils.rs
//
// 毫秒時間戳與 DateTime<Utc> 之間的轉換。
// 交易所數據以毫秒時間戳表示時間，領域模型統一使用 DateTime<Utc>。

use chrono::{DateTime, TimeZone, Utc};

/// 將 DateTime<Utc> 轉換為毫秒時間戳
pub fn datetime_to_timestamp_ms(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// 將毫秒時間戳轉換為 DateTime<Utc>，超出可表示範圍時返回 None
pub fn timestamp_ms_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ts).single()
}
