//! Redis Identity Repository 实现
//!
//! 键布局：
//! - `identity:{id}`：身份记录（JSON）
//! - `identity:handle:{handle}` / `identity:contact:{contact}`：唯一性占位，值为身份 ID
//! - `identities`：分值全为 0 的有序索引，成员为身份 ID
//!
//! 唯一性依赖 `SET NX` 占位；多步写入失败时回滚已占用的键。
//! 游标为索引中上一页的最后一个成员。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cuba_common::{IdentityId, Page, PageCursor, PageRequest};
use cuba_errors::{AppError, AppResult};
use cuba_ports::KeyValueStore;
use tracing::warn;

use crate::domain::Identity;
use crate::domain::repositories::{
    DISPLAY_NAME_MATCH_LIMIT, IdentityRepository, ensure_valid_page, parse_cursor,
};

const IDENTITY_INDEX: &str = "identities";
const SCAN_BATCH: usize = 500;

fn record_key(id: &IdentityId) -> String {
    format!("identity:{}", id)
}

fn handle_key(handle: &str) -> String {
    format!("identity:handle:{}", handle)
}

fn contact_key(contact: &str) -> String {
    format!("identity:contact:{}", contact)
}

pub struct RedisIdentityRepository {
    store: Arc<dyn KeyValueStore>,
}

impl RedisIdentityRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn decode(raw: &str) -> AppResult<Identity> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::internal(format!("Corrupted identity record: {}", e)))
    }

    fn encode(identity: &Identity) -> AppResult<String> {
        serde_json::to_string(identity)
            .map_err(|e| AppError::internal(format!("Failed to serialize identity: {}", e)))
    }

    /// 占用唯一键，已被占用时返回 `Conflict`
    async fn claim(&self, key: &str, id: &str, what: &str) -> AppResult<()> {
        if self.store.set_nx(key, id, None).await? {
            Ok(())
        } else {
            Err(AppError::conflict(format!("{} already exists", what)))
        }
    }

    /// 释放本身份持有的唯一键；键已不存在或属于他人时不做任何事
    async fn release(&self, key: &str, id: &str) -> AppResult<()> {
        self.store.delete_if_equals(key, id).await.map(|_| ())
    }

    /// 回滚路径上的释放，失败只记录日志，保留原始错误
    async fn release_quietly(&self, key: &str, id: &str) {
        if let Err(e) = self.release(key, id).await {
            warn!(key = key, error = %e, "Failed to release identity key");
        }
    }

    async fn load_many(&self, ids: &[String]) -> AppResult<Vec<Identity>> {
        let keys: Vec<String> = ids.iter().map(|id| format!("identity:{}", id)).collect();
        let values = self.store.mget(&keys).await?;

        // 索引与记录之间可能存在短暂不一致（并发删除），跳过缺失项
        values
            .into_iter()
            .flatten()
            .map(|raw| Self::decode(&raw))
            .collect()
    }
}

#[async_trait]
impl IdentityRepository for RedisIdentityRepository {
    async fn insert(&self, identity: &Identity) -> AppResult<()> {
        let id = identity.id.to_string();
        let handle_key = handle_key(&identity.handle);
        let contact_key = contact_key(&identity.contact);
        let payload = Self::encode(identity)?;

        self.claim(&handle_key, &id, "Handle").await?;

        if let Err(e) = self.claim(&contact_key, &id, "Contact address").await {
            self.release_quietly(&handle_key, &id).await;
            return Err(e);
        }

        let stored = match self
            .store
            .set_nx(&record_key(&identity.id), &payload, None)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::conflict("Identity already exists")),
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            self.release_quietly(&contact_key, &id).await;
            self.release_quietly(&handle_key, &id).await;
            return Err(e);
        }

        if let Err(e) = self.store.index_add(IDENTITY_INDEX, &id).await {
            if let Err(cleanup) = self.store.delete(&record_key(&identity.id)).await {
                warn!(identity_id = %identity.id, error = %cleanup, "Failed to roll back identity record");
            }
            self.release_quietly(&contact_key, &id).await;
            self.release_quietly(&handle_key, &id).await;
            return Err(e);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &IdentityId) -> AppResult<Identity> {
        match self.store.get(&record_key(id)).await? {
            Some(raw) => Self::decode(&raw),
            None => Err(AppError::not_found(format!("Identity {} not found", id))),
        }
    }

    async fn find_by_handle(&self, handle: &str) -> AppResult<Identity> {
        let not_found = || AppError::not_found(format!("Identity with handle {} not found", handle));

        let raw_id = self.store.get(&handle_key(handle)).await?.ok_or_else(not_found)?;
        let id = IdentityId::from_string(&raw_id)
            .map_err(|_| AppError::internal(format!("Corrupted handle entry for {}", handle)))?;

        match self.find_by_id(&id).await {
            Err(AppError::NotFound(_)) => Err(not_found()),
            other => other,
        }
    }

    async fn find_by_display_name(&self, fragment: &str) -> AppResult<Vec<Identity>> {
        let needle = fragment.to_lowercase();
        let mut matches = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let ids = self
                .store
                .index_range(IDENTITY_INDEX, after.as_deref(), SCAN_BATCH)
                .await?;
            if ids.is_empty() {
                break;
            }

            for identity in self.load_many(&ids).await? {
                if identity.display_name.to_lowercase().contains(&needle) {
                    matches.push(identity);
                    if matches.len() == DISPLAY_NAME_MATCH_LIMIT {
                        return Ok(matches);
                    }
                }
            }

            if ids.len() < SCAN_BATCH {
                break;
            }
            after = ids.last().cloned();
        }

        Ok(matches)
    }

    async fn update(&self, identity: &Identity) -> AppResult<Identity> {
        let current = self.find_by_id(&identity.id).await?;
        let id = identity.id.to_string();

        let mut updated = identity.clone();
        updated.created_at = current.created_at;
        updated.updated_at = Utc::now();

        let handle_changed = updated.handle != current.handle;
        let contact_changed = updated.contact != current.contact;

        if handle_changed {
            self.claim(&handle_key(&updated.handle), &id, "Handle").await?;
        }
        if contact_changed {
            if let Err(e) = self
                .claim(&contact_key(&updated.contact), &id, "Contact address")
                .await
            {
                if handle_changed {
                    self.release_quietly(&handle_key(&updated.handle), &id).await;
                }
                return Err(e);
            }
        }

        let written = match Self::encode(&updated) {
            Ok(payload) => self.store.set_xx(&record_key(&identity.id), &payload).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(true) => {
                if handle_changed {
                    self.release_quietly(&handle_key(&current.handle), &id).await;
                }
                if contact_changed {
                    self.release_quietly(&contact_key(&current.contact), &id).await;
                }
                Ok(updated)
            }
            failed => {
                if handle_changed {
                    self.release_quietly(&handle_key(&updated.handle), &id).await;
                }
                if contact_changed {
                    self.release_quietly(&contact_key(&updated.contact), &id).await;
                }
                match failed {
                    Err(e) => Err(e),
                    _ => Err(AppError::not_found(format!("Identity {} not found", id))),
                }
            }
        }
    }

    /// 记录最后删除：清理中途失败时记录仍在，重试会补完剩余步骤
    async fn delete_by_id(&self, id: &IdentityId) -> AppResult<()> {
        let current = self.find_by_id(id).await?;
        let raw_id = id.to_string();

        self.store.index_remove(IDENTITY_INDEX, &raw_id).await?;
        self.release(&handle_key(&current.handle), &raw_id).await?;
        self.release(&contact_key(&current.contact), &raw_id).await?;

        if !self.store.delete(&record_key(id)).await? {
            return Err(AppError::not_found(format!("Identity {} not found", id)));
        }
        Ok(())
    }

    async fn find_all(&self, page: &PageRequest) -> AppResult<Page<Identity>> {
        ensure_valid_page(page)?;
        let after = parse_cursor(page)?.map(|id| id.to_string());

        let mut ids = self
            .store
            .index_range(IDENTITY_INDEX, after.as_deref(), page.fetch_limit())
            .await?;

        let next_cursor = if ids.len() > page.size as usize {
            ids.truncate(page.size as usize);
            ids.last().cloned().map(PageCursor::new)
        } else {
            None
        };

        let items = self.load_many(&ids).await?;
        Ok(Page { items, next_cursor })
    }
}
