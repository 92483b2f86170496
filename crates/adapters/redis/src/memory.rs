//! 进程内 KeyValueStore 实现
//!
//! 与 `RedisKeyValueStore` 语义一致，用于测试和本地开发。

use async_trait::async_trait;
use cuba_errors::{AppError, AppResult};
use cuba_ports::KeyValueStore;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Inner {
    values: HashMap<String, Entry>,
    indexes: HashMap<String, BTreeSet<String>>,
}

impl Inner {
    fn live_value(&mut self, key: &str) -> Option<&String> {
        let now = Instant::now();
        if self.values.get(key).is_some_and(|entry| !entry.is_live(now)) {
            self.values.remove(key);
        }
        self.values.get(key).map(|entry| &entry.value)
    }
}

/// 进程内键值存储
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟存储不可达：之后的所有操作返回 `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self, op: &str) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable(format!(
                "In-memory store {} failed: unavailable",
                op
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.ensure_available("get")?;
        Ok(self.inner.lock().live_value(key).cloned())
    }

    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        self.ensure_available("mget")?;
        let mut inner = self.inner.lock();
        Ok(keys.iter().map(|k| inner.live_value(k).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.ensure_available("set")?;
        self.inner.lock().values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        self.ensure_available("set_nx")?;
        let mut inner = self.inner.lock();
        if inner.live_value(key).is_some() {
            return Ok(false);
        }
        inner.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn set_xx(&self, key: &str, value: &str) -> AppResult<bool> {
        self.ensure_available("set_xx")?;
        let mut inner = self.inner.lock();
        if inner.live_value(key).is_none() {
            return Ok(false);
        }
        inner.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.ensure_available("delete")?;
        let mut inner = self.inner.lock();
        let existed = inner.live_value(key).is_some();
        inner.values.remove(key);
        let indexed = inner.indexes.remove(key).is_some();
        Ok(existed || indexed)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> AppResult<bool> {
        self.ensure_available("delete_if_equals")?;
        let mut inner = self.inner.lock();
        if inner.live_value(key).is_some_and(|v| v == expected) {
            inner.values.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn index_add(&self, index: &str, member: &str) -> AppResult<()> {
        self.ensure_available("index_add")?;
        self.inner
            .lock()
            .indexes
            .entry(index.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn index_remove(&self, index: &str, member: &str) -> AppResult<()> {
        self.ensure_available("index_remove")?;
        if let Some(set) = self.inner.lock().indexes.get_mut(index) {
            set.remove(member);
        }
        Ok(())
    }

    async fn index_range(
        &self,
        index: &str,
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<String>> {
        self.ensure_available("index_range")?;
        let inner = self.inner.lock();
        let Some(set) = inner.indexes.get(index) else {
            return Ok(Vec::new());
        };

        let lower = match after {
            Some(member) => Bound::Excluded(member.to_string()),
            None => Bound::Unbounded,
        };

        Ok(set
            .range((lower, Bound::Unbounded))
            .take(limit)
            .cloned()
            .collect())
    }
}
