//! Key-Value 存储 trait 定义

use async_trait::async_trait;
use cuba_errors::AppResult;
use std::time::Duration;

/// 易失性键值存储 trait
///
/// 所有传输层故障以 `AppError::StoreUnavailable` 返回，与"键不存在"区分。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 获取值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 批量获取，结果与 `keys` 一一对应
    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>>;

    /// 无条件写入
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// 仅当键不存在时写入，返回是否写入成功
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<bool>;

    /// 仅当键已存在时覆盖，返回是否写入成功
    async fn set_xx(&self, key: &str, value: &str) -> AppResult<bool>;

    /// 删除键，返回键此前是否存在
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// 仅当当前值等于 `expected` 时删除（原子比较删除）
    async fn delete_if_equals(&self, key: &str, expected: &str) -> AppResult<bool>;

    /// 向有序索引添加成员
    async fn index_add(&self, index: &str, member: &str) -> AppResult<()>;

    /// 从有序索引移除成员
    async fn index_remove(&self, index: &str, member: &str) -> AppResult<()>;

    /// 按字典序读取索引中严格大于 `after` 的至多 `limit` 个成员
    async fn index_range(
        &self,
        index: &str,
        after: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<String>>;
}
