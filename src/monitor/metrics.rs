use metrics::{counter, histogram};
use std::time::Duration;

/// 監控指標命名空間
pub const METRIC_NAMESPACE: &str = "candle_engine";

/// 監控指標類型
#[derive(Debug, Clone, Copy)]
pub enum MetricType {
    /// K 線寫入序列的結果（inserted / refreshed / appended / backfilled / dropped）
    Append {
        outcome: &'static str,
    },
    /// 發現不連續的 K 線（gap / out_of_order）
    Discontinuity {
        kind: &'static str,
    },
    /// 補齊缺口時插入的合成 K 線數量
    Backfill {
        count: usize,
    },
    /// 計算耗時
    Latency {
        operation: &'static str,
    },
}

/// K 線計算核心的監控指標記錄器
pub struct EngineMetrics;

impl EngineMetrics {
    /// 記錄監控指標
    ///
    /// # Arguments
    /// * `metric_type` - 指標類型
    /// * `duration` - 可選的持續時間，用於延遲指標
    pub fn record(metric_type: MetricType, duration: Option<Duration>) {
        match metric_type {
            MetricType::Append { outcome } => {
                counter!(
                    format!("{}.series.append", METRIC_NAMESPACE),
                    "outcome" => outcome
                )
                .increment(1);
            }
            MetricType::Discontinuity { kind } => {
                counter!(
                    format!("{}.series.discontinuity", METRIC_NAMESPACE),
                    "kind" => kind
                )
                .increment(1);
            }
            MetricType::Backfill { count } => {
                counter!(format!("{}.series.backfilled", METRIC_NAMESPACE)).increment(count as u64);
            }
            MetricType::Latency { operation } => {
                if let Some(dur) = duration {
                    histogram!(
                        format!("{}.compute.latency_ns", METRIC_NAMESPACE),
                        "operation" => operation
                    )
                    .record(dur.as_nanos() as f64);
                }
            }
        }
    }

    /// 記錄計算耗時
    pub fn record_latency(operation: &'static str, duration: Duration) {
        Self::record(MetricType::Latency { operation }, Some(duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        // 未安裝 recorder 時所有指標都應該被安靜地忽略
        EngineMetrics::record(MetricType::Append { outcome: "appended" }, None);
        EngineMetrics::record(MetricType::Discontinuity { kind: "gap" }, None);
        EngineMetrics::record(MetricType::Backfill { count: 3 }, None);
        EngineMetrics::record_latency("resample", Duration::from_micros(15));
    }
}
