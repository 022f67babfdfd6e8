//! 应用配置模块
//!
//! 提供应用程序配置的加载、保存、环境变量覆盖与校验
//!
//! # 使用示例
//!
//! ```no_run
//! use voxroom_lib::config::{AppConfig, ConfigManager};
//!
//! // 加载配置，文件不存在时使用默认值
//! let mut config = ConfigManager::load("voxroom.json").unwrap();
//!
//! // 使用 LIVEKIT_* 环境变量覆盖
//! config.apply_env();
//! config.validate().unwrap();
//!
//! // 保存配置
//! ConfigManager::save("voxroom.json", &config).unwrap();
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionConfig;

/// 服务器地址环境变量
pub const ENV_SERVER_URL: &str = "LIVEKIT_URL";
/// API Key 环境变量
pub const ENV_API_KEY: &str = "LIVEKIT_API_KEY";
/// API Secret 环境变量
pub const ENV_API_SECRET: &str = "LIVEKIT_API_SECRET";

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置值无效
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 媒体服务器配置
    pub livekit: LiveKitConfig,
    /// 会话配置
    pub session: SessionConfig,
}

/// 媒体服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveKitConfig {
    /// 服务器地址（wss://...）
    pub server_url: String,
    /// API Key
    pub api_key: String,
    /// API Secret
    pub api_secret: String,
    /// 加入的房间名
    pub room_name: String,
    /// 参与者身份前缀
    pub identity_prefix: String,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            room_name: "agent-room".to_string(),
            identity_prefix: "user-".to_string(),
        }
    }
}

impl LiveKitConfig {
    /// 根据用户 ID 生成参与者身份
    pub fn participant_identity(&self, user_id: &str) -> String {
        format!("{}{}", self.identity_prefix, user_id)
    }

    /// 是否已配置 API 凭据
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl AppConfig {
    /// 使用环境变量覆盖配置
    ///
    /// 仅覆盖已设置且非空的变量
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets = [
            (ENV_SERVER_URL, &mut self.livekit.server_url),
            (ENV_API_KEY, &mut self.livekit.api_key),
            (ENV_API_SECRET, &mut self.livekit.api_secret),
        ];

        for (name, field) in targets {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                tracing::debug!(var = name, "Config overridden from environment");
                *field = value;
            }
        }
    }

    /// 校验配置
    ///
    /// # Errors
    ///
    /// 服务器地址、凭据或房间名为空，或超时/队列容量为 0 时返回 `ConfigError::Invalid`
    pub fn validate(&self) -> ConfigResult<()> {
        if self.livekit.server_url.is_empty() {
            return Err(ConfigError::Invalid("server_url is empty".to_string()));
        }
        if !self.livekit.has_credentials() {
            return Err(ConfigError::Invalid(
                "api_key and api_secret are required".to_string(),
            ));
        }
        if self.livekit.room_name.is_empty() {
            return Err(ConfigError::Invalid("room_name is empty".to_string()));
        }
        if self.session.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be positive".to_string(),
            ));
        }
        if self.session.listener_capacity == 0 {
            return Err(ConfigError::Invalid(
                "listener_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 配置管理器
///
/// 以格式化 JSON 读写配置文件
pub struct ConfigManager;

impl ConfigManager {
    /// 加载配置
    ///
    /// 从配置文件加载配置，如果文件不存在则返回默认配置
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
        let path = path.as_ref();

        tracing::debug!(path = %path.display(), "Loading config");

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            tracing::info!(path = %path.display(), "Config loaded successfully");
            Ok(config)
        } else {
            tracing::info!("Config file not found, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// 保存配置
    pub fn save(path: impl AsRef<Path>, config: &AppConfig) -> ConfigResult<()> {
        let path = path.as_ref();

        tracing::debug!(path = %path.display(), "Saving config");

        // 确保目录存在
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(path, content)?;

        tracing::info!(path = %path.display(), "Config saved successfully");
        Ok(())
    }
}
