//! Identity 实体

use std::fmt;

use chrono::{DateTime, Utc};
use cuba_common::IdentityId;
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const HANDLE_MIN_LEN: usize = 3;
const HANDLE_MAX_LEN: usize = 64;

/// 身份密钥材料
///
/// 作为不透明的可比较数据保存，Debug 输出脱敏。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretMaterial(String);

impl SecretMaterial {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 比较提交的密钥，耗时与内容无关
    pub fn matches(&self, presented: &str) -> bool {
        let stored = self.0.as_bytes();
        let presented = presented.as_bytes();
        if stored.len() != presented.len() {
            return false;
        }
        stored
            .iter()
            .zip(presented)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial([REDACTED])")
    }
}

/// 已注册身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub handle: String,
    pub display_name: String,
    pub contact: String,
    pub secret: SecretMaterial,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// 注册新身份：生成 ID，校验 handle 与联系地址
    pub fn register(
        handle: &str,
        display_name: &str,
        contact: &str,
        secret: &str,
    ) -> Result<Self, AuthError> {
        validate_handle(handle)?;
        let display_name = normalize_display_name(display_name)?;
        let contact = normalize_contact(contact)?;
        let now = Utc::now();

        Ok(Self {
            id: IdentityId::new(),
            handle: handle.to_string(),
            display_name,
            contact,
            secret: SecretMaterial::new(secret),
            created_at: now,
            updated_at: now,
        })
    }

    /// 应用部分修改；未提供的字段保持不变
    pub fn apply(&mut self, changes: IdentityChanges) -> Result<(), AuthError> {
        if let Some(handle) = changes.handle {
            validate_handle(&handle)?;
            self.handle = handle;
        }
        if let Some(display_name) = changes.display_name {
            self.display_name = normalize_display_name(&display_name)?;
        }
        if let Some(contact) = changes.contact {
            self.contact = normalize_contact(&contact)?;
        }
        if let Some(secret) = changes.secret {
            self.secret = SecretMaterial::new(secret);
        }
        Ok(())
    }
}

/// 身份部分修改
#[derive(Debug, Clone, Default)]
pub struct IdentityChanges {
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub contact: Option<String>,
    pub secret: Option<String>,
}

impl IdentityChanges {
    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
            && self.display_name.is_none()
            && self.contact.is_none()
            && self.secret.is_none()
    }
}

/// handle 规则：3-64 个字符，仅允许字母、数字、`_`、`.`、`-`
pub fn validate_handle(handle: &str) -> Result<(), AuthError> {
    let len = handle.chars().count();
    if !(HANDLE_MIN_LEN..=HANDLE_MAX_LEN).contains(&len) {
        return Err(AuthError::InvalidHandle(format!(
            "length must be between {} and {}",
            HANDLE_MIN_LEN, HANDLE_MAX_LEN
        )));
    }
    if let Some(c) = handle
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(AuthError::InvalidHandle(format!(
            "character '{}' is not allowed",
            c
        )));
    }
    Ok(())
}

/// 校验联系地址并统一为小写
pub fn normalize_contact(contact: &str) -> Result<String, AuthError> {
    let contact = contact.trim();
    if !EmailAddress::is_valid(contact) {
        return Err(AuthError::InvalidContact(contact.to_string()));
    }
    Ok(contact.to_lowercase())
}

fn normalize_display_name(display_name: &str) -> Result<String, AuthError> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::EmptyDisplayName);
    }
    Ok(trimmed.to_string())
}
