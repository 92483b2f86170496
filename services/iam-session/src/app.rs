//! 服务组装

use std::sync::Arc;
use std::time::Duration;

use cuba_bootstrap::Infrastructure;
use cuba_config::IdentityBackend;
use cuba_ports::KeyValueStore;
use tracing::info;

use crate::application::{AuthCoordinator, IdentityService};
use crate::domain::repositories::{IdentityRepository, TokenStore};
use crate::infrastructure::cache::KvTokenStore;
use crate::infrastructure::events::{
    AuthEventPublisher, ChannelEventPublisher, LoggingEventPublisher,
};
use crate::infrastructure::persistence::{PostgresIdentityRepository, RedisIdentityRepository};

/// 组装完成的服务
///
/// 协调器使用配置选定的身份后端；两个后端都保留给列表与 CRUD 接口。
pub struct SessionApp {
    pub coordinator: Arc<AuthCoordinator>,
    pub identities: IdentityService,
    pub durable_identities: IdentityService,
    pub ephemeral_identities: IdentityService,
}

impl SessionApp {
    pub fn from_infrastructure(infra: &Infrastructure) -> Self {
        let config = infra.config();
        let kv: Arc<dyn KeyValueStore> = Arc::new(infra.key_value_store());

        // 组装身份仓储
        let durable: Arc<dyn IdentityRepository> =
            Arc::new(PostgresIdentityRepository::new(infra.postgres_pool()));
        let ephemeral: Arc<dyn IdentityRepository> =
            Arc::new(RedisIdentityRepository::new(kv.clone()));
        let active = match config.identity.backend {
            IdentityBackend::Postgres => durable.clone(),
            IdentityBackend::Redis => ephemeral.clone(),
        };

        // 组装 Token Store
        let mut token_store = KvTokenStore::new(kv).with_lock_timing(
            Duration::from_millis(config.token_store.lock_ttl_ms),
            Duration::from_millis(config.token_store.lock_wait_ms),
        );
        if config.token_store.prune_expired {
            token_store = token_store.with_pruning(infra.codec());
        }
        let tokens: Arc<dyn TokenStore> = Arc::new(token_store);

        // 组装事件发布器
        let publisher: Arc<dyn AuthEventPublisher> = match infra.message_channel() {
            Some(channel) => Arc::new(ChannelEventPublisher::new(channel)),
            None => Arc::new(LoggingEventPublisher),
        };

        info!(
            backend = ?config.identity.backend,
            channel = %config.events.channel,
            prune_expired = config.token_store.prune_expired,
            "Session service assembled"
        );

        let coordinator = Arc::new(AuthCoordinator::new(
            active.clone(),
            infra.codec(),
            tokens,
            publisher,
            config.events.channel.clone(),
        ));

        Self {
            coordinator,
            identities: IdentityService::new(active),
            durable_identities: IdentityService::new(durable),
            ephemeral_identities: IdentityService::new(ephemeral),
        }
    }
}
