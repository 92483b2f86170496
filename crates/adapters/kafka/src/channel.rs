//! Kafka MessageChannel 实现

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use cuba_errors::{AppError, AppResult};
use cuba_ports::MessageChannel;
use parking_lot::RwLock;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::debug;

use crate::admin::KafkaAdmin;
use crate::config::{ProducerConfig, TopicSettings};

/// 基于 Kafka 的消息通道
///
/// 进程内共用一个 `FutureProducer`；同一 key 落到同一分区，顺序得以保持。
/// 已声明过的 Topic 记录在本地，避免每次发送都访问 Admin API。
pub struct KafkaMessageChannel {
    producer: FutureProducer,
    admin: KafkaAdmin,
    topic_settings: TopicSettings,
    declared: RwLock<HashSet<String>>,
    timeout: Duration,
}

impl KafkaMessageChannel {
    pub fn new(config: &ProducerConfig, topic_settings: TopicSettings) -> AppResult<Self> {
        let mut client_config = ClientConfig::new();

        for (key, value) in config.to_client_config_entries() {
            client_config.set(&key, &value);
        }

        let producer: FutureProducer = client_config
            .create()
            .map_err(|e| AppError::internal(format!("Failed to create Kafka producer: {}", e)))?;

        let admin = KafkaAdmin::new(&config.base)?.with_timeout(config.request_timeout);

        Ok(Self {
            producer,
            admin,
            topic_settings,
            declared: RwLock::new(HashSet::new()),
            timeout: config.request_timeout,
        })
    }

    /// 刷新所有待发送的消息
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(Timeout::After(timeout)) {
            debug!(error = %e, "Kafka producer flush incomplete");
        }
    }
}

#[async_trait]
impl MessageChannel for KafkaMessageChannel {
    async fn declare(&self, channel: &str) -> AppResult<()> {
        if self.declared.read().contains(channel) {
            return Ok(());
        }

        self.admin.ensure_topic(channel, self.topic_settings).await?;
        self.declared.write().insert(channel.to_string());
        Ok(())
    }

    async fn send(&self, channel: &str, key: &str, payload: &[u8]) -> AppResult<()> {
        let record: FutureRecord<'_, str, [u8]> =
            FutureRecord::to(channel).payload(payload).key(key);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _)| {
                AppError::delivery(format!("Failed to publish to {}: {}", channel, e))
            })?;

        debug!(
            topic = channel,
            key = key,
            partition = partition,
            offset = offset,
            "Message published with key"
        );

        Ok(())
    }
}
