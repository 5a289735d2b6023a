use config::ConfigError;
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::loader::{ConfigLoader, Environment};
use crate::config::types::ApplicationConfig;
use crate::config::validation::Validator;

// 全局配置實例
static CONFIG: OnceCell<ApplicationConfig> = OnceCell::new();

/// 獲取應用程序配置實例，首次調用時從當前環境加載
pub fn get_config() -> Result<&'static ApplicationConfig, ConfigError> {
    CONFIG.get_or_try_init(ApplicationConfig::load_from_env)
}

/// 初始化配置（在應用程序啟動時調用）
pub fn init_config() -> Result<(), ConfigError> {
    let app_config = ApplicationConfig::load_from_env()?;

    if CONFIG.set(app_config).is_err() {
        warn!("配置已經被初始化，跳過重複初始化");
    } else {
        debug!("配置初始化成功，環境：{:?}", Environment::from_env());
    }

    Ok(())
}

impl ApplicationConfig {
    /// 從環境變數指定的環境加載配置
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let env = Environment::from_env();
        debug!("從環境加載配置: {:?}", env);
        Self::load(env)
    }

    /// 從指定環境加載配置
    pub fn load(env: Environment) -> Result<Self, ConfigError> {
        Self::from_source(ConfigLoader::load(env)?)
    }

    /// 從指定目錄加載配置
    pub fn load_from(dir: &Path, env: Environment) -> Result<Self, ConfigError> {
        Self::from_source(ConfigLoader::load_from(dir, env)?)
    }

    /// 反序列化並驗證，驗證失敗視為配置錯誤
    fn from_source(source: config::Config) -> Result<Self, ConfigError> {
        let app_config: ApplicationConfig = source.try_deserialize()?;

        if let Err(err) = app_config.validate() {
            warn!("配置驗證失敗: {}", err);
            return Err(ConfigError::Message(err.to_string()));
        }
        debug!("配置驗證通過");

        Ok(app_config)
    }
}
