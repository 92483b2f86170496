//! cuba-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token 集合存在，但不包含指定凭证
    #[error("Credential not found: {0}")]
    CredentialNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Invalid credential signature: {0}")]
    InvalidSignature(String),

    #[error("Credential expired: {0}")]
    CredentialExpired(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn credential_not_found(msg: impl Into<String>) -> Self {
        Self::CredentialNotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn malformed_credential(msg: impl Into<String>) -> Self {
        Self::MalformedCredential(msg.into())
    }

    pub fn invalid_signature(msg: impl Into<String>) -> Self {
        Self::InvalidSignature(msg.into())
    }

    pub fn credential_expired(msg: impl Into<String>) -> Self {
        Self::CredentialExpired(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// 是否属于凭证校验失败（格式、签名、过期）
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedCredential(_) | Self::InvalidSignature(_) | Self::CredentialExpired(_)
        )
    }

    /// 是否属于授权拒绝
    pub fn is_authorization_denied(&self) -> bool {
        self.is_credential_error() || matches!(self, Self::Forbidden(_))
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::CredentialNotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::MalformedCredential(_) => 401,
            Self::InvalidSignature(_) => 401,
            Self::CredentialExpired(_) => 401,
            Self::Delivery(_) => 502,
            Self::StoreUnavailable(_) => 503,
            Self::Cancelled(_) => 408,
            Self::ResourceExhausted(_) => 429,
            Self::Internal(_) => 500,
            Self::Database(_) => 500,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: format!("https://api.cuba-erp.com/problems/{}", self.problem_slug()),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_slug(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::CredentialNotFound(_) => "credential-not-found",
            Self::Validation(_) => "validation",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::MalformedCredential(_) => "malformed-credential",
            Self::InvalidSignature(_) => "invalid-signature",
            Self::CredentialExpired(_) => "credential-expired",
            Self::Delivery(_) => "delivery",
            Self::StoreUnavailable(_) => "store-unavailable",
            Self::Cancelled(_) => "cancelled",
            Self::ResourceExhausted(_) => "resource-exhausted",
            Self::Internal(_) => "internal",
            Self::Database(_) => "database",
        }
    }

    fn problem_title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::CredentialNotFound(_) => "Credential Not Found",
            Self::Validation(_) => "Validation Error",
            Self::Unauthenticated(_) => "Unauthenticated",
            Self::Forbidden(_) => "Forbidden",
            Self::Conflict(_) => "Conflict",
            Self::MalformedCredential(_) => "Malformed Credential",
            Self::InvalidSignature(_) => "Invalid Signature",
            Self::CredentialExpired(_) => "Credential Expired",
            Self::Delivery(_) => "Delivery Error",
            Self::StoreUnavailable(_) => "Store Unavailable",
            Self::Cancelled(_) => "Request Cancelled",
            Self::ResourceExhausted(_) => "Resource Exhausted",
            Self::Internal(_) => "Internal Server Error",
            Self::Database(_) => "Database Error",
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("x").status_code(), 404);
        assert_eq!(AppError::conflict("x").status_code(), 409);
        assert_eq!(AppError::credential_expired("x").status_code(), 401);
        assert_eq!(AppError::store_unavailable("x").status_code(), 503);
        assert_eq!(AppError::delivery("x").status_code(), 502);
    }

    #[test]
    fn test_authorization_denied_classification() {
        assert!(AppError::malformed_credential("x").is_authorization_denied());
        assert!(AppError::invalid_signature("x").is_authorization_denied());
        assert!(AppError::credential_expired("x").is_authorization_denied());
        assert!(AppError::forbidden("x").is_authorization_denied());
        assert!(!AppError::not_found("x").is_authorization_denied());
        assert!(!AppError::forbidden("x").is_credential_error());
    }

    #[test]
    fn test_problem_details() {
        let details = AppError::conflict("handle already exists").to_problem_details();
        assert_eq!(details.status, 409);
        assert_eq!(details.title, "Conflict");
        assert!(details.r#type.ends_with("/conflict"));
        assert_eq!(details.detail, "Conflict: handle already exists");

        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("instance").is_none());
    }
}
