// monitor/logger.rs - 日誌系統初始化

use anyhow::{anyhow, Result};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::LogConfig;

/// 將配置中的日誌級別字串轉換為 tracing 的級別
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // 默認為INFO
    }
}

/// 初始化全局日誌系統
///
/// `RUST_LOG` 環境變數中的過濾規則優先於配置中的級別。
/// 全局訂閱者只能設置一次，重複調用會返回錯誤。
pub fn init_logging(log_config: &LogConfig) -> Result<()> {
    let level = parse_level(&log_config.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder().with_env_filter(filter);

    let result = if log_config.format.eq_ignore_ascii_case("compact") {
        tracing::subscriber::set_global_default(builder.compact().finish())
    } else {
        tracing::subscriber::set_global_default(builder.pretty().finish())
    };

    result.map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!(level = %level, format = %log_config.format, "日誌系統初始化完成");
    Ok(())
}
