//! Token Store trait

use async_trait::async_trait;
use cuba_common::IdentityId;
use cuba_errors::AppResult;
use serde::{Deserialize, Serialize};

/// 单个身份当前有效的凭证集合，按加入顺序排列且不含重复
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub identity_id: IdentityId,
    pub credentials: Vec<String>,
}

impl TokenSet {
    pub fn empty(identity_id: IdentityId) -> Self {
        Self {
            identity_id,
            credentials: Vec::new(),
        }
    }

    pub fn contains(&self, credential: &str) -> bool {
        self.credentials.iter().any(|c| c == credential)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// 追加凭证；已存在时不做任何修改，集合不存在时自动创建
    async fn add_credential(&self, identity_id: &IdentityId, credential: &str) -> AppResult<()>;

    /// 整体替换集合，读方不会看到新旧混合的状态
    async fn replace_all(&self, identity_id: &IdentityId, credentials: Vec<String>)
    -> AppResult<()>;

    /// 移除一个凭证：集合不存在返回 `NotFound`，凭证不在集合中返回 `CredentialNotFound`
    async fn remove_credential(&self, identity_id: &IdentityId, credential: &str)
    -> AppResult<()>;

    async fn get(&self, identity_id: &IdentityId) -> AppResult<TokenSet>;
}
