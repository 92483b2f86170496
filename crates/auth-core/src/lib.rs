//! cuba-auth-core - 认证核心库
//!
//! 会话凭证的签发与校验（JWT HS256）

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use cuba_common::IdentityId;
use cuba_errors::{AppError, AppResult};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 默认凭证有效期：24 小时
pub const DEFAULT_CREDENTIAL_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity ID)
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID
    pub jti: String,
}

/// 校验通过的凭证内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub identity_id: IdentityId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// 时钟抽象，便于测试中控制"当前时间"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟，只在显式推进时变化
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// 签名密钥
///
/// 进程启动时从配置读取一次，之后只读。
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// 凭证编解码器
#[derive(Clone)]
pub struct CredentialCodec {
    key: Arc<SigningKey>,
    lifetime: Duration,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl CredentialCodec {
    pub fn new(
        key: Arc<SigningKey>,
        lifetime: Duration,
        issuer: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            key,
            lifetime,
            issuer: issuer.into(),
            clock,
        }
    }

    /// 使用系统时钟和默认有效期
    pub fn with_defaults(key: Arc<SigningKey>, issuer: impl Into<String>) -> Self {
        Self::new(
            key,
            Duration::seconds(DEFAULT_CREDENTIAL_LIFETIME_SECS),
            issuer,
            Arc::new(SystemClock),
        )
    }

    fn key(&self) -> &SigningKey {
        &self.key
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// 签发凭证
    pub fn mint(&self, identity_id: &IdentityId) -> AppResult<String> {
        let now = self.clock.now();
        let claims = Claims {
            sub: identity_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::now_v7().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.key().encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign credential: {}", e)))
    }

    /// 校验凭证
    ///
    /// 只做签名与时间计算，不访问任何外部存储。过期判断使用注入的时钟，
    /// 因此不依赖 jsonwebtoken 内部的系统时间。
    pub fn verify(&self, credential: &str) -> AppResult<VerifiedCredential> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let token_data = decode::<Claims>(credential, &self.key().decoding, &validation)
            .map_err(map_jwt_error)?;
        let claims = token_data.claims;

        let identity_id = IdentityId::from_string(&claims.sub)
            .map_err(|_| AppError::malformed_credential("Invalid identity ID in credential"))?;
        let issued_at = timestamp_to_datetime(claims.iat)?;
        let expires_at = timestamp_to_datetime(claims.exp)?;

        if self.clock.now() > expires_at {
            return Err(AppError::credential_expired(format!(
                "Credential expired at {}",
                expires_at
            )));
        }

        Ok(VerifiedCredential {
            identity_id,
            issued_at,
            expires_at,
        })
    }

    /// 凭证是否已过期；无法解析的凭证返回 `None`
    pub fn is_expired(&self, credential: &str) -> Option<bool> {
        match self.verify(credential) {
            Ok(_) => Some(false),
            Err(AppError::CredentialExpired(_)) => Some(true),
            Err(_) => None,
        }
    }
}

fn timestamp_to_datetime(ts: i64) -> AppResult<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| AppError::malformed_credential("Invalid timestamp in credential"))
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AppError {
    match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            AppError::invalid_signature(e.to_string())
        }
        ErrorKind::ExpiredSignature => AppError::credential_expired(e.to_string()),
        _ => AppError::malformed_credential(e.to_string()),
    }
}
