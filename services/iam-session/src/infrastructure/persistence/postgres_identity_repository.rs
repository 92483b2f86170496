//! PostgreSQL Identity Repository 实现
//!
//! 游标为上一页最后一条记录的 ID，下一页使用 `id > cursor` 查询，
//! 并发插入不会导致重复或遗漏已读记录。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cuba_adapter_postgres::map_sqlx_error;
use cuba_common::{IdentityId, Page, PageCursor, PageRequest};
use cuba_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::repositories::{
    DISPLAY_NAME_MATCH_LIMIT, IdentityRepository, ensure_valid_page, parse_cursor,
};
use crate::domain::{Identity, SecretMaterial};

pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn insert(&self, identity: &Identity) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO identities (id, handle, display_name, contact, secret, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(identity.id.0)
        .bind(&identity.handle)
        .bind(&identity.display_name)
        .bind(&identity.contact)
        .bind(identity.secret.expose())
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &IdentityId) -> AppResult<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, handle, display_name, contact, secret, created_at, updated_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(IdentityRow::into_identity)
            .ok_or_else(|| AppError::not_found(format!("Identity {} not found", id)))
    }

    async fn find_by_handle(&self, handle: &str) -> AppResult<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, handle, display_name, contact, secret, created_at, updated_at
            FROM identities
            WHERE handle = $1
            "#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(IdentityRow::into_identity)
            .ok_or_else(|| AppError::not_found(format!("Identity with handle {} not found", handle)))
    }

    async fn find_by_display_name(&self, fragment: &str) -> AppResult<Vec<Identity>> {
        let pattern = format!("%{}%", escape_like(fragment));

        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, handle, display_name, contact, secret, created_at, updated_at
            FROM identities
            WHERE display_name ILIKE $1 ESCAPE '\'
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(DISPLAY_NAME_MATCH_LIMIT as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(IdentityRow::into_identity).collect())
    }

    async fn update(&self, identity: &Identity) -> AppResult<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            UPDATE identities SET
                handle = $2, display_name = $3, contact = $4, secret = $5, updated_at = $6
            WHERE id = $1
            RETURNING id, handle, display_name, contact, secret, created_at, updated_at
            "#,
        )
        .bind(identity.id.0)
        .bind(&identity.handle)
        .bind(&identity.display_name)
        .bind(&identity.contact)
        .bind(identity.secret.expose())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(IdentityRow::into_identity)
            .ok_or_else(|| AppError::not_found(format!("Identity {} not found", identity.id)))
    }

    async fn delete_by_id(&self, id: &IdentityId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Identity {} not found", id)));
        }
        Ok(())
    }

    async fn find_all(&self, page: &PageRequest) -> AppResult<Page<Identity>> {
        ensure_valid_page(page)?;
        let after: Option<Uuid> = parse_cursor(page)?.map(|id| id.0);

        let rows = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, handle, display_name, contact, secret, created_at, updated_at
            FROM identities
            WHERE $1::uuid IS NULL OR id > $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(page.fetch_limit() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows.into_iter().map(IdentityRow::into_identity).collect();
        Ok(Page::from_overfetch(items, page.size, |identity| {
            PageCursor::new(identity.id.to_string())
        }))
    }
}

/// 转义 LIKE 模式中的通配符
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    handle: String,
    display_name: String,
    contact: String,
    secret: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_identity(self) -> Identity {
        Identity {
            id: IdentityId::from_uuid(self.id),
            handle: self.handle,
            display_name: self.display_name,
            contact: self.contact,
            secret: SecretMaterial::new(self.secret),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
