//! Identity Repository trait

use async_trait::async_trait;
use cuba_common::{IdentityId, MAX_PAGE_SIZE, Page, PageRequest};
use cuba_errors::{AppError, AppResult};

use crate::domain::Identity;

/// 按显示名搜索时返回的最大条数
pub const DISPLAY_NAME_MATCH_LIMIT: usize = 10;

/// 身份仓储
///
/// 持久化（PostgreSQL）与易失（Redis）两种实现对调用方行为一致，
/// 唯一差别是分页游标的内部编码。
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// 新增身份；handle 或联系地址已存在时返回 `Conflict`
    async fn insert(&self, identity: &Identity) -> AppResult<()>;

    async fn find_by_id(&self, id: &IdentityId) -> AppResult<Identity>;

    async fn find_by_handle(&self, handle: &str) -> AppResult<Identity>;

    /// 大小写不敏感的子串匹配，按 ID 升序，最多 `DISPLAY_NAME_MATCH_LIMIT` 条
    async fn find_by_display_name(&self, fragment: &str) -> AppResult<Vec<Identity>>;

    /// 整体替换可变字段并刷新最后修改时间，返回写入后的记录
    async fn update(&self, identity: &Identity) -> AppResult<Identity>;

    async fn delete_by_id(&self, id: &IdentityId) -> AppResult<()>;

    /// 按 ID 升序的键集分页
    async fn find_all(&self, page: &PageRequest) -> AppResult<Page<Identity>>;
}

/// 校验页大小
pub fn ensure_valid_page(page: &PageRequest) -> AppResult<()> {
    if !page.is_valid_size() {
        return Err(AppError::validation(format!(
            "Page size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

/// 解析游标中的身份 ID
pub fn parse_cursor(page: &PageRequest) -> AppResult<Option<IdentityId>> {
    page.cursor
        .as_ref()
        .map(|cursor| {
            IdentityId::from_string(cursor.as_str())
                .map_err(|_| AppError::validation("Invalid page cursor"))
        })
        .transpose()
}
