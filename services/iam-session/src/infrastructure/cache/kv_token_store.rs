//! 基于 KeyValueStore 的 Token Store
//!
//! 每个身份的集合以 JSON 存放在 `token_set:{id}`。读-改-写在按键加锁的
//! 临界区内完成：锁键 `token_set:{id}:lock` 通过 `SET NX PX` 获取，
//! 以随机令牌比较删除释放，持锁进程崩溃时由 TTL 兜底。
//!
//! 锁由 [`LockGuard`] 持有：调用方的 future 在临界区内被丢弃（超时或取消）时，
//! 释放操作转交给后台任务执行。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cuba_auth_core::CredentialCodec;
use cuba_common::IdentityId;
use cuba_errors::{AppError, AppResult};
use cuba_ports::KeyValueStore;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::repositories::{TokenSet, TokenStore};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

pub struct KvTokenStore {
    store: Arc<dyn KeyValueStore>,
    lock_ttl: Duration,
    lock_wait: Duration,
    /// 设置后，追加凭证前先剔除已过期条目
    pruner: Option<Arc<CredentialCodec>>,
}

impl KvTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock_ttl: Duration::from_secs(5),
            lock_wait: Duration::from_secs(2),
            pruner: None,
        }
    }

    pub fn with_lock_timing(mut self, lock_ttl: Duration, lock_wait: Duration) -> Self {
        self.lock_ttl = lock_ttl;
        self.lock_wait = lock_wait;
        self
    }

    pub fn with_pruning(mut self, codec: Arc<CredentialCodec>) -> Self {
        self.pruner = Some(codec);
        self
    }

    fn set_key(identity_id: &IdentityId) -> String {
        format!("token_set:{}", identity_id)
    }

    fn lock_key(identity_id: &IdentityId) -> String {
        format!("token_set:{}:lock", identity_id)
    }

    /// 获取按键锁
    async fn acquire(&self, lock_key: String) -> AppResult<LockGuard> {
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.lock_wait;

        loop {
            if self
                .store
                .set_nx(&lock_key, &token, Some(self.lock_ttl))
                .await?
            {
                return Ok(LockGuard {
                    store: self.store.clone(),
                    key: lock_key,
                    token,
                    held: true,
                });
            }
            if Instant::now() >= deadline {
                return Err(AppError::resource_exhausted(format!(
                    "Timed out waiting for lock {}",
                    lock_key
                )));
            }
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    async fn load(&self, identity_id: &IdentityId) -> AppResult<Option<TokenSet>> {
        match self.store.get(&Self::set_key(identity_id)).await? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                AppError::internal(format!("Corrupted token set for {}: {}", identity_id, e))
            }),
            None => Ok(None),
        }
    }

    async fn save(&self, set: &TokenSet) -> AppResult<()> {
        let raw = serde_json::to_string(set)
            .map_err(|e| AppError::internal(format!("Failed to serialize token set: {}", e)))?;
        self.store.set(&Self::set_key(&set.identity_id), &raw).await
    }

    async fn locked_add(&self, identity_id: &IdentityId, credential: &str) -> AppResult<()> {
        let mut set = self
            .load(identity_id)
            .await?
            .unwrap_or_else(|| TokenSet::empty(*identity_id));

        if let Some(codec) = &self.pruner {
            let before = set.len();
            set.credentials
                .retain(|c| c == credential || codec.is_expired(c) != Some(true));
            let pruned = before - set.len();
            if pruned > 0 {
                debug!(identity_id = %identity_id, pruned, "Pruned expired credentials");
            }
        }

        if !set.contains(credential) {
            set.credentials.push(credential.to_string());
        }
        self.save(&set).await
    }

    async fn locked_remove(&self, identity_id: &IdentityId, credential: &str) -> AppResult<()> {
        let mut set = self.load(identity_id).await?.ok_or_else(|| {
            AppError::not_found(format!("No token set for identity {}", identity_id))
        })?;

        let position = set
            .credentials
            .iter()
            .position(|c| c == credential)
            .ok_or_else(|| {
                AppError::credential_not_found(format!(
                    "Credential is not active for identity {}",
                    identity_id
                ))
            })?;
        set.credentials.remove(position);
        self.save(&set).await
    }
}

/// 持有中的按键锁
///
/// 正常路径调用 [`LockGuard::release`]；未释放即被丢弃时在当前运行时上派生释放任务。
struct LockGuard {
    store: Arc<dyn KeyValueStore>,
    key: String,
    token: String,
    held: bool,
}

impl LockGuard {
    async fn release(mut self) {
        release_lock(self.store.as_ref(), &self.key, &self.token).await;
        self.held = false;
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(lock_key = %key, "Releasing lock abandoned by an aborted operation");
                handle.spawn(async move {
                    release_lock(store.as_ref(), &key, &token).await;
                });
            }
            Err(_) => warn!(lock_key = %key, "No runtime to release lock, left to expire"),
        }
    }
}

async fn release_lock(store: &dyn KeyValueStore, lock_key: &str, token: &str) {
    match store.delete_if_equals(lock_key, token).await {
        Ok(true) => {}
        Ok(false) => warn!(lock_key = lock_key, "Lock expired before release"),
        Err(e) => warn!(lock_key = lock_key, error = %e, "Failed to release lock"),
    }
}

#[async_trait]
impl TokenStore for KvTokenStore {
    async fn add_credential(&self, identity_id: &IdentityId, credential: &str) -> AppResult<()> {
        let lock = self.acquire(Self::lock_key(identity_id)).await?;
        let result = self.locked_add(identity_id, credential).await;
        lock.release().await;
        result
    }

    async fn replace_all(
        &self,
        identity_id: &IdentityId,
        credentials: Vec<String>,
    ) -> AppResult<()> {
        let mut set = TokenSet::empty(*identity_id);
        for credential in credentials {
            if !set.contains(&credential) {
                set.credentials.push(credential);
            }
        }

        // 整体写入是单条 SET；加锁避免与进行中的追加交错覆盖
        let lock = self.acquire(Self::lock_key(identity_id)).await?;
        let result = self.save(&set).await;
        lock.release().await;
        result
    }

    async fn remove_credential(
        &self,
        identity_id: &IdentityId,
        credential: &str,
    ) -> AppResult<()> {
        let lock = self.acquire(Self::lock_key(identity_id)).await?;
        let result = self.locked_remove(identity_id, credential).await;
        lock.release().await;
        result
    }

    async fn get(&self, identity_id: &IdentityId) -> AppResult<TokenSet> {
        self.load(identity_id).await?.ok_or_else(|| {
            AppError::not_found(format!("No token set for identity {}", identity_id))
        })
    }
}
