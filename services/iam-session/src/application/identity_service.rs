//! 身份管理服务
//!
//! 认证流程之外的查询、修改与删除，供列表和 CRUD 接口使用。

use std::sync::Arc;

use cuba_common::{IdentityId, Page, PageRequest};
use cuba_errors::AppResult;
use tracing::info;

use super::RequestContext;
use crate::domain::repositories::IdentityRepository;
use crate::domain::{Identity, IdentityChanges};

#[derive(Clone)]
pub struct IdentityService {
    identities: Arc<dyn IdentityRepository>,
}

impl IdentityService {
    pub fn new(identities: Arc<dyn IdentityRepository>) -> Self {
        Self { identities }
    }

    pub async fn get(&self, ctx: &RequestContext, id: &IdentityId) -> AppResult<Identity> {
        ctx.run("identity_get", self.identities.find_by_id(id)).await
    }

    pub async fn get_by_handle(&self, ctx: &RequestContext, handle: &str) -> AppResult<Identity> {
        ctx.run("identity_get", self.identities.find_by_handle(handle))
            .await
    }

    /// 按显示名模糊搜索
    pub async fn search(&self, ctx: &RequestContext, fragment: &str) -> AppResult<Vec<Identity>> {
        ctx.run("identity_search", self.identities.find_by_display_name(fragment))
            .await
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: &PageRequest,
    ) -> AppResult<Page<Identity>> {
        ctx.run("identity_list", self.identities.find_all(page)).await
    }

    /// 部分修改：未提供的字段保持不变，没有任何修改时直接返回当前记录
    pub async fn update_by_id(
        &self,
        ctx: &RequestContext,
        id: &IdentityId,
        changes: IdentityChanges,
    ) -> AppResult<Identity> {
        let mut identity = ctx.run("identity_get", self.identities.find_by_id(id)).await?;
        if changes.is_empty() {
            return Ok(identity);
        }

        identity.apply(changes)?;

        let updated = ctx
            .run("identity_update", self.identities.update(&identity))
            .await?;
        info!(identity_id = %id, "Identity updated");
        Ok(updated)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: &IdentityId) -> AppResult<()> {
        ctx.run("identity_delete", self.identities.delete_by_id(id))
            .await?;
        info!(identity_id = %id, "Identity deleted");
        Ok(())
    }
}
