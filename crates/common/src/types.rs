//! 通用类型定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 身份 ID
///
/// 使用 UUIDv7 生成，按字节序与创建时间同序，两个存储后端都以它作为分页排序键。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[display("{_0}")]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

/// 单页最大条数
pub const MAX_PAGE_SIZE: u32 = 1000;

/// 分页游标
///
/// 对调用方不透明，必须原样回传。内部编码由各存储后端自行决定。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// 分页请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 上一页返回的游标，`None` 表示从头开始
    pub cursor: Option<PageCursor>,
    /// 每页条数
    pub size: u32,
}

impl PageRequest {
    pub fn first(size: u32) -> Self {
        Self { cursor: None, size }
    }

    pub fn after(cursor: PageCursor, size: u32) -> Self {
        Self {
            cursor: Some(cursor),
            size,
        }
    }

    /// 是否为合法的页大小
    pub fn is_valid_size(&self) -> bool {
        self.size > 0 && self.size <= MAX_PAGE_SIZE
    }

    /// 实际查询条数（多取一条用于判断是否还有下一页）
    pub fn fetch_limit(&self) -> usize {
        self.size as usize + 1
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 下一页游标，`None` 表示已经没有更多数据
    pub next_cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// 由多取一条的查询结果构造分页
    ///
    /// `items` 超过 `size` 时截断，并以最后一条保留项生成下一页游标。
    pub fn from_overfetch(
        mut items: Vec<T>,
        size: u32,
        cursor_of: impl Fn(&T) -> PageCursor,
    ) -> Self {
        let size = size as usize;
        if items.len() > size {
            items.truncate(size);
            let next_cursor = items.last().map(&cursor_of);
            Self { items, next_cursor }
        } else {
            Self {
                items,
                next_cursor: None,
            }
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_id_roundtrip_string() {
        let id = IdentityId::new();
        let parsed = IdentityId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_identity_id_ordering_follows_creation() {
        let first = IdentityId::new();
        let second = IdentityId::new();
        assert!(first < second);
        assert!(first.to_string() < second.to_string());
    }

    #[test]
    fn test_page_request_size_bounds() {
        assert!(!PageRequest::first(0).is_valid_size());
        assert!(PageRequest::first(1).is_valid_size());
        assert!(PageRequest::first(MAX_PAGE_SIZE).is_valid_size());
        assert!(!PageRequest::first(MAX_PAGE_SIZE + 1).is_valid_size());
        assert_eq!(PageRequest::first(2).fetch_limit(), 3);
    }

    #[test]
    fn test_page_from_overfetch_with_more() {
        let page = Page::from_overfetch(vec![1, 2, 3], 2, |n| PageCursor::new(n.to_string()));
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_cursor, Some(PageCursor::new("2")));
    }

    #[test]
    fn test_page_from_overfetch_exhausted() {
        let page = Page::from_overfetch(vec![3], 2, |n: &i32| PageCursor::new(n.to_string()));
        assert_eq!(page.items, vec![3]);
        assert!(page.is_last());

        let empty = Page::from_overfetch(Vec::<i32>::new(), 2, |n| PageCursor::new(n.to_string()));
        assert!(empty.items.is_empty());
        assert!(empty.is_last());
    }

    #[test]
    fn test_page_cursor_is_transparent_json() {
        let cursor = PageCursor::new("abc");
        assert_eq!(serde_json::to_string(&cursor).unwrap(), "\"abc\"");
    }
}
