//! 基础设施资源管理
//!
//! 统一初始化服务依赖的外部资源

use std::sync::Arc;
use std::time::Duration;

use cuba_adapter_kafka::{KafkaMessageChannel, ProducerConfig, TopicSettings};
use cuba_adapter_postgres::{PostgresConfig, create_pool};
use cuba_adapter_redis::{RedisKeyValueStore, create_connection_manager};
use cuba_auth_core::{CredentialCodec, SigningKey, SystemClock};
use cuba_config::AppConfig;
use cuba_errors::AppResult;
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::retry::{RetryConfig, with_retry};

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// PostgreSQL 连接池
    postgres_pool: PgPool,
    /// Redis 连接管理器
    redis_conn: ConnectionManager,
    /// 凭证编解码器
    codec: Arc<CredentialCodec>,
    /// Kafka 消息通道（可选）
    message_channel: Option<Arc<KafkaMessageChannel>>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（连接阶段带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let retry_config = RetryConfig::default();

        // 1. PostgreSQL 连接池
        let pg_config = PostgresConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections);
        let postgres_pool = with_retry(&retry_config, "PostgreSQL connection", || {
            let cfg = pg_config.clone();
            async move { create_pool(&cfg).await }
        })
        .await?;
        info!(
            max_connections = config.database.max_connections,
            "PostgreSQL connection pool created"
        );

        // 2. Redis 连接
        let redis_url = config.redis.url.clone();
        let redis_conn = with_retry(&retry_config, "Redis connection", || {
            let url = redis_url.expose_secret().clone();
            async move { create_connection_manager(&url).await }
        })
        .await?;
        info!("Redis connection created");

        // 3. 凭证编解码器，密钥只在此处读取一次
        let signing_key = Arc::new(SigningKey::from_secret(
            config.jwt.secret.expose_secret().as_bytes(),
        ));
        let codec = Arc::new(CredentialCodec::new(
            signing_key,
            chrono::Duration::seconds(config.jwt.expires_in as i64),
            config.jwt.issuer.clone(),
            Arc::new(SystemClock),
        ));

        // 4. Kafka 消息通道（可选）
        let message_channel = if let Some(kafka_config) = &config.kafka {
            let client_id = kafka_config
                .client_id
                .clone()
                .unwrap_or_else(|| config.app_name.clone());
            let producer_config = ProducerConfig::new(&kafka_config.brokers)
                .with_client_id(client_id)
                .with_request_timeout(Duration::from_millis(kafka_config.request_timeout_ms));
            let settings = TopicSettings {
                num_partitions: kafka_config.num_partitions,
                replication_factor: kafka_config.replication_factor,
            };
            let channel = KafkaMessageChannel::new(&producer_config, settings)?;
            info!(brokers = %kafka_config.brokers, "Kafka message channel created");
            Some(Arc::new(channel))
        } else {
            info!("Kafka not configured, skipping");
            None
        };

        Ok(Self {
            config,
            postgres_pool,
            redis_conn,
            codec,
            message_channel,
        })
    }

    /// 获取应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取 PostgreSQL 连接池
    pub fn postgres_pool(&self) -> PgPool {
        self.postgres_pool.clone()
    }

    /// 获取 Redis 键值存储（实现 KeyValueStore trait）
    pub fn key_value_store(&self) -> RedisKeyValueStore {
        RedisKeyValueStore::new(self.redis_conn.clone())
    }

    /// 获取凭证编解码器
    pub fn codec(&self) -> Arc<CredentialCodec> {
        self.codec.clone()
    }

    /// 获取 Kafka 消息通道（如果可用）
    pub fn message_channel(&self) -> Option<Arc<KafkaMessageChannel>> {
        self.message_channel.clone()
    }

    /// 刷新待发送消息，关闭前调用
    pub fn flush(&self, timeout: Duration) {
        if let Some(channel) = &self.message_channel {
            channel.flush(timeout);
        }
    }
}
