//! Kafka 配置模块

use std::time::Duration;

/// Kafka 基础配置
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Broker 地址列表
    pub brokers: String,
    /// 客户端 ID
    pub client_id: Option<String>,
    /// 额外配置项
    pub extra: Vec<(String, String)>,
}

impl KafkaConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: None,
            extra: Vec::new(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![("bootstrap.servers".to_string(), self.brokers.clone())];

        if let Some(client_id) = &self.client_id {
            entries.push(("client.id".to_string(), client_id.clone()));
        }

        entries.extend(self.extra.iter().cloned());
        entries
    }
}

/// Producer 配置
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// 基础配置
    pub base: KafkaConfig,
    /// 确认级别（-1 表示 all）
    pub acks: i32,
    /// 幂等生产（保证同一分区内顺序且不重复）
    pub enable_idempotence: bool,
    /// 单条消息投递超时
    pub request_timeout: Duration,
    pub linger_ms: u64,
}

impl ProducerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            base: KafkaConfig::new(brokers),
            acks: -1,
            enable_idempotence: true,
            request_timeout: Duration::from_secs(5),
            linger_ms: 0,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.base = self.base.with_client_id(client_id);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        let mut entries = self.base.to_client_config_entries();

        entries.push(("acks".to_string(), self.acks.to_string()));
        entries.push(("linger.ms".to_string(), self.linger_ms.to_string()));
        entries.push((
            "message.timeout.ms".to_string(),
            self.request_timeout.as_millis().to_string(),
        ));

        if self.enable_idempotence {
            entries.push(("enable.idempotence".to_string(), "true".to_string()));
        }

        entries
    }
}

/// Topic 创建参数
#[derive(Debug, Clone, Copy)]
pub struct TopicSettings {
    pub num_partitions: i32,
    pub replication_factor: i32,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            num_partitions: 1,
            replication_factor: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(entries: &'a [(String, String)], key: &str) -> Option<&'a str> {
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_producer_config_entries() {
        let config = ProducerConfig::new("localhost:9092")
            .with_client_id("iam-session")
            .with_request_timeout(Duration::from_millis(1500));

        let entries = config.to_client_config_entries();
        assert_eq!(lookup(&entries, "bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(lookup(&entries, "client.id"), Some("iam-session"));
        assert_eq!(lookup(&entries, "acks"), Some("-1"));
        assert_eq!(lookup(&entries, "enable.idempotence"), Some("true"));
        assert_eq!(lookup(&entries, "message.timeout.ms"), Some("1500"));
    }

    #[test]
    fn test_extra_entries() {
        let config = KafkaConfig::new("b1:9092,b2:9092").with_extra("security.protocol", "ssl");
        let entries = config.to_client_config_entries();
        assert_eq!(lookup(&entries, "security.protocol"), Some("ssl"));
        assert_eq!(lookup(&entries, "client.id"), None);
    }
}
