//! 基于 MessageChannel 的事件发布器

use std::sync::Arc;

use async_trait::async_trait;
use cuba_errors::{AppError, AppResult};
use cuba_ports::MessageChannel;
use tracing::debug;

use super::AuthEventPublisher;
use crate::domain::AuthEvent;

/// 先声明通道再发送，消息以身份 ID 为键，保证同一身份的事件顺序
pub struct ChannelEventPublisher {
    channel: Arc<dyn MessageChannel>,
}

impl ChannelEventPublisher {
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self { channel }
    }
}

fn as_delivery(err: AppError) -> AppError {
    match err {
        e @ AppError::Delivery(_) => e,
        other => AppError::delivery(other.to_string()),
    }
}

#[async_trait]
impl AuthEventPublisher for ChannelEventPublisher {
    async fn publish_auth_event(&self, channel: &str, event: &AuthEvent) -> AppResult<()> {
        let payload = serde_json::to_vec(event)
            .map_err(|e| AppError::delivery(format!("Failed to encode auth event: {}", e)))?;
        let key = event.identity_id.to_string();

        self.channel.declare(channel).await.map_err(as_delivery)?;
        self.channel
            .send(channel, &key, &payload)
            .await
            .map_err(as_delivery)?;

        debug!(channel = channel, identity_id = %key, "Auth event delivered");
        Ok(())
    }
}
