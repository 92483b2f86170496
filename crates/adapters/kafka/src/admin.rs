//! Kafka Admin 模块
//!
//! 提供 Topic 幂等声明

use std::time::Duration;

use cuba_errors::{AppError, AppResult};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::RDKafkaErrorCode;
use tracing::{debug, error, info};

use crate::config::{KafkaConfig, TopicSettings};

/// Kafka Admin 客户端
pub struct KafkaAdmin {
    admin: AdminClient<DefaultClientContext>,
    timeout: Duration,
}

impl KafkaAdmin {
    /// 创建 Admin 客户端
    pub fn new(config: &KafkaConfig) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let admin: AdminClient<DefaultClientContext> = client_config
            .create()
            .map_err(|e| AppError::internal(format!("Failed to create admin client: {}", e)))?;

        Ok(Self {
            admin,
            timeout: Duration::from_secs(30),
        })
    }

    /// 设置超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 确保 Topic 存在
    ///
    /// 返回 `true` 表示本次新建，`false` 表示已存在。
    pub async fn ensure_topic(&self, name: &str, settings: TopicSettings) -> AppResult<bool> {
        let new_topic = NewTopic::new(
            name,
            settings.num_partitions,
            TopicReplication::Fixed(settings.replication_factor),
        );

        let opts = AdminOptions::new().operation_timeout(Some(self.timeout));

        let results = self
            .admin
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(|e| AppError::delivery(format!("Failed to declare topic {}: {}", name, e)))?;

        let mut created = false;
        for result in results {
            match result {
                Ok(topic) => {
                    info!(topic = %topic, "Topic created successfully");
                    created = true;
                }
                Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    debug!(topic = %topic, "Topic already exists");
                }
                Err((topic, err)) => {
                    error!(topic = %topic, error = ?err, "Failed to create topic");
                    return Err(AppError::delivery(format!(
                        "Failed to declare topic {}: {:?}",
                        topic, err
                    )));
                }
            }
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例 (KAFKA_BROKERS)
    async fn test_ensure_topic_is_idempotent() {
        let brokers = std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".into());
        let admin = KafkaAdmin::new(&KafkaConfig::new(brokers)).unwrap();
        let topic = format!("test-declare-{}", uuid::Uuid::now_v7());

        assert!(admin.ensure_topic(&topic, TopicSettings::default()).await.unwrap());
        assert!(!admin.ensure_topic(&topic, TopicSettings::default()).await.unwrap());
    }
}
