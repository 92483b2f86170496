//! 事件发布器
//!
//! 提供认证事件的发布功能

use async_trait::async_trait;
use cuba_errors::AppResult;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::AuthEvent;

/// 认证事件发布器 trait
///
/// 至少一次投递：发送前确保通道存在，声明或发送失败都返回 `Delivery`，
/// 内部不重试。
#[async_trait]
pub trait AuthEventPublisher: Send + Sync {
    async fn publish_auth_event(&self, channel: &str, event: &AuthEvent) -> AppResult<()>;
}

/// 内存事件总线实现
pub struct InMemoryEventBus {
    events: Arc<RwLock<Vec<(String, AuthEvent)>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// 获取所有发布的事件及其通道（用于测试）
    pub async fn get_events(&self) -> Vec<(String, AuthEvent)> {
        self.events.read().await.clone()
    }

    /// 清空事件（用于测试）
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthEventPublisher for InMemoryEventBus {
    async fn publish_auth_event(&self, channel: &str, event: &AuthEvent) -> AppResult<()> {
        tracing::info!(
            channel = channel,
            identity_id = %event.identity_id,
            "Auth event published"
        );
        self.events
            .write()
            .await
            .push((channel.to_string(), event.clone()));
        Ok(())
    }
}

/// 日志事件发布器
///
/// 未配置消息通道时使用，凭证本身不写入日志。
pub struct LoggingEventPublisher;

#[async_trait]
impl AuthEventPublisher for LoggingEventPublisher {
    async fn publish_auth_event(&self, channel: &str, event: &AuthEvent) -> AppResult<()> {
        tracing::info!(
            channel = channel,
            identity_id = %event.identity_id,
            "Auth event (no message channel configured)"
        );
        Ok(())
    }
}
