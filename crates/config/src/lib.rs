//! cuba-config - 配置加载库

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// Redis 配置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Secret<String>,
}

/// Kafka 配置
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    pub client_id: Option<String>,
    #[serde(default = "default_num_partitions")]
    pub num_partitions: i32,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_num_partitions() -> i32 {
    1
}

fn default_replication_factor() -> i32 {
    1
}

fn default_request_timeout_ms() -> u64 {
    5000
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    /// 凭证有效期（秒），默认 24 小时
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_expires_in() -> u64 {
    86400
}

fn default_issuer() -> String {
    "iam-session".to_string()
}

/// 认证事件配置
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "user_id_jwt".to_string()
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
        }
    }
}

/// 身份仓储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    #[default]
    Postgres,
    Redis,
}

/// 身份仓储配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub backend: IdentityBackend,
}

/// Token 集合配置
#[derive(Debug, Clone, Deserialize)]
pub struct TokenStoreConfig {
    /// 单个身份键锁的持有上限（毫秒）
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,
    /// 等待键锁的最长时间（毫秒）
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
    /// 追加凭证时是否清理已过期条目
    #[serde(default = "default_prune_expired")]
    pub prune_expired: bool,
}

fn default_lock_ttl_ms() -> u64 {
    5000
}

fn default_lock_wait_ms() -> u64 {
    2000
}

fn default_prune_expired() -> bool {
    true
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: default_lock_ttl_ms(),
            lock_wait_ms: default_lock_wait_ms(),
            prune_expired: default_prune_expired(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus 指标监听地址，例如 `0.0.0.0:9464`
    pub metrics_addr: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_addr: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: Option<KafkaConfig>,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub token_store: TokenStoreConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 环境变量使用 `IAM_` 前缀，`__` 分隔层级，例如 `IAM_JWT__SECRET`。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("IAM_").split("__"));

        Self::from_figment(figment)
    }

    /// 从已组装好的 Figment 提取配置
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
