/// 配置管理模組
///
/// 本模組負責加載、驗證和管理系統配置。
/// 按 `CANDLE_ENV` 選擇開發或生產環境的配置文件，環境變數可覆蓋文件中的值。
pub mod loader;
pub mod manager;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigExt, ConfigLoader, Environment};
pub use manager::{get_config, init_config};
pub use types::*;
pub use validation::{validate_config, ValidationError, ValidationUtils, Validator};
