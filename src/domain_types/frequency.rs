//! 頻率定義模組 - 從 config/frequencies.toml 編譯時生成
//!
//! 這個模組包含交易所 K 線週期的類型定義，在編譯時從配置檔案自動生成。
//! 所有週期定義都是靜態的，序列化時使用交易所的週期字串（例如 `"1m"`、`"4h"`）。

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// 包含由 build.rs 生成的頻率宏定義
include!(concat!(env!("OUT_DIR"), "/frequencies_generated.rs"));

/// 生成頻率枚舉的內部宏
macro_rules! generate_frequency_enum {
    ($(($variant:ident, $interval:literal, $milliseconds:literal, $display:literal)),*) => {
        /// K 線週期定義
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Frequency {
            $(
                $variant,
            )*
        }

        impl Frequency {
            /// 轉換為表示該週期的 chrono::Duration
            pub fn to_duration(&self) -> Duration {
                Duration::milliseconds(self.milliseconds())
            }

            /// 獲取週期的毫秒數
            pub fn milliseconds(&self) -> i64 {
                match self {
                    $(
                        Frequency::$variant => $milliseconds as i64,
                    )*
                }
            }

            /// 交易所使用的週期字串
            pub fn interval(&self) -> &'static str {
                match self {
                    $(
                        Frequency::$variant => $interval,
                    )*
                }
            }

            /// 獲取顯示名稱
            pub fn display_name(&self) -> &'static str {
                match self {
                    $(
                        Frequency::$variant => $display,
                    )*
                }
            }

            /// 從交易所週期字串解析
            pub fn from_interval(interval: &str) -> Option<Frequency> {
                match interval {
                    $(
                        $interval => Some(Frequency::$variant),
                    )*
                    _ => None,
                }
            }

            /// 獲取所有頻率列表
            pub fn all() -> Vec<Frequency> {
                vec![
                    $(
                        Frequency::$variant,
                    )*
                ]
            }
        }
    };
}

// 使用主宏生成所有程式碼
frequencies!(generate_frequency_enum);

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.interval())
    }
}

/// 無法識別的週期字串
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未知的 K 線週期: {0}")]
pub struct UnknownFrequency(pub String);

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Frequency::from_interval(s).ok_or_else(|| UnknownFrequency(s.to_string()))
    }
}

impl TryFrom<String> for Frequency {
    type Error = UnknownFrequency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.interval().to_string()
    }
}

impl From<Frequency> for Duration {
    fn from(freq: Frequency) -> Self {
        freq.to_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_conversions() {
        assert_eq!(Frequency::Minute1.to_duration(), Duration::minutes(1));
        assert_eq!(Frequency::Hour1.to_duration(), Duration::hours(1));
        assert_eq!(Frequency::Day1.to_duration(), Duration::days(1));
        assert_eq!(Frequency::Week1.to_duration(), Duration::weeks(1));
    }

    #[test]
    fn test_frequency_interval_round_trip() {
        for freq in Frequency::all() {
            assert_eq!(Frequency::from_interval(freq.interval()), Some(freq));
            assert_eq!(freq.to_string().parse::<Frequency>().unwrap(), freq);
        }
        assert!("7m".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_frequency_all_is_ascending() {
        let all = Frequency::all();
        assert_eq!(all.len(), 14);
        assert!(all.windows(2).all(|w| w[0].milliseconds() < w[1].milliseconds()));
    }
}
