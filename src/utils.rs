// utils.rs - 公共工具模組

pub mod time_utils;

// 重新導出時間工具函數，使其可以通過 utils::function_name 直接訪問
pub use time_utils::{datetime_to_timestamp_ms, timestamp_ms_to_datetime};
