//! 认证事件

use cuba_common::IdentityId;
use serde::{Deserialize, Serialize};

/// 认证事件
///
/// 每次注册或登录成功后发出一次，消息体为 `{identity_id, credential}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub identity_id: IdentityId,
    pub credential: String,
}

impl AuthEvent {
    pub fn new(identity_id: IdentityId, credential: impl Into<String>) -> Self {
        Self {
            identity_id,
            credential: credential.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let id = IdentityId::new();
        let event = AuthEvent::new(id, "token");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["identity_id"], id.to_string());
        assert_eq!(json["credential"], "token");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
