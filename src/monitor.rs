// monitor.rs - 監控系統模組
//
// 日誌使用 tracing，計數與延遲使用 metrics 門面；
// 兩者在未初始化訂閱者 / recorder 時都不會產生任何輸出。

pub mod logger;
pub mod metrics;

// 重新導出常用元素，使其可直接從 monitor 模組使用
pub use logger::{init_logging, parse_level};
pub use metrics::{EngineMetrics, MetricType, METRIC_NAMESPACE};
