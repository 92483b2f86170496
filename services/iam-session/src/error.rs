//! 服务错误定义

use cuba_errors::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Credential does not belong to this identity")]
    IdentityMismatch,

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid contact address: {0}")]
    InvalidContact(String),

    #[error("Display name must not be empty")]
    EmptyDisplayName,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::unauthenticated("Invalid credentials"),
            AuthError::IdentityMismatch => {
                AppError::forbidden("Credential does not belong to this identity")
            }
            e @ (AuthError::InvalidHandle(_)
            | AuthError::InvalidContact(_)
            | AuthError::EmptyDisplayName) => AppError::validation(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_mapping() {
        assert!(matches!(
            AppError::from(AuthError::InvalidCredentials),
            AppError::Unauthenticated(_)
        ));
        assert!(AppError::from(AuthError::IdentityMismatch).is_authorization_denied());

        let err = AppError::from(AuthError::InvalidHandle("too short".into()));
        assert_eq!(err.to_string(), "Validation error: Invalid handle: too short");
    }
}
