//! Redis KeyValueStore 实现

use async_trait::async_trait;
use cuba_errors::AppResult;
use cuba_ports::KeyValueStore;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::time::Duration;

use crate::map_redis_error;

/// 基于 Redis 的键值存储
///
/// 有序索引使用分值全为 0 的 ZSET，按成员字典序做区间读取。
#[derive(Clone)]
pub struct RedisKeyValueStore {
    conn: ConnectionManager,
}

impl RedisKeyValueStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| map_redis_error("get", e))
    }

    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        redis::cmd("MGET")
            .arg(keys)
            .query_async::<Vec<Option<String>>>(&mut conn)
            .await
            .map_err(|e| map_redis_error("mget", e))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| map_redis_error("set", e))
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }

        let result: Option<String> = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("set_nx", e))?;

        Ok(result.is_some())
    }

    async fn set_xx(&self, key: &str, value: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("XX")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("set_xx", e))?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn
            .del(key)
            .await
            .map_err(|e| map_redis_error("delete", e))?;
        Ok(deleted > 0)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();

        // 比较与删除必须在同一脚本内完成
        let script = Script::new(
            r"
            if redis.call('GET', KEYS[1]) == ARGV[1] then
                return redis.call('DEL', KEYS[1])
            else
                return 0
            end
            ",
        );

        let deleted: i64 = script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("delete_if_equals", e))?;

        Ok(deleted > 0)
    }

    async fn index_add(&self, index: &str, member: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(index, member, 0)
            .await
            .map_err(|e| map_redis_error("index_add", e))
    }

    async fn index_remove(&self, index: &str, member: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        conn.zrem::<_, _, ()>(index, member)
            .await
            .map_err(|e| map_redis_error("index_remove", e))
    }

    async fn index_range(
        &self,
        index: &str,
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let min = match after {
            Some(member) => format!("({}", member),
            None => "-".to_string(),
        };

        redis::cmd("ZRANGEBYLEX")
            .arg(index)
            .arg(min)
            .arg("+")
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async::<Vec<String>>(&mut conn)
            .await
            .map_err(|e| map_redis_error("index_range", e))
    }
}
