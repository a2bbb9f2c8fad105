//! Luna 客户端共享领域层
//!
//! 纯逻辑，不依赖 DOM，可在原生目标上测试：
//! - `session`: 会话状态与认证事件
//! - `role` / `onboarding`: 角色与引导状态解析
//! - `platform`: 运行平台判定
//! - `route` / `guard`: 路由定义与守卫决策
//! - `query`: 以身份为键的查询追踪与缓存
//! - `connectivity`: 在线/离线状态机

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

pub mod connectivity;
pub mod date;
pub mod error;
pub mod guard;
pub mod onboarding;
pub mod platform;
pub mod protocol;
pub mod query;
pub mod role;
pub mod route;
pub mod session;

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_API_KEY: &str = "apikey";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const STORAGE_SESSION_KEY: &str = "luna_session";
pub const STORAGE_BACKEND_URL_KEY: &str = "luna_backend_url";

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 身份提供方签发的用户 ID（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 当前登录身份的只读视图
///
/// 由身份提供方的 user 对象反序列化而来，多余字段忽略。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(id),
            email: None,
        }
    }
}

/// `profiles` 表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: IdentityId,
    /// 缺省或为 null 时视为未完成
    #[serde(default, deserialize_with = "null_as_false")]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_extra_user_fields() {
        let json = r#"{
            "id": "7f1c",
            "aud": "authenticated",
            "email": "a@luna.app",
            "app_metadata": {"provider": "email"}
        }"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id.as_str(), "7f1c");
        assert_eq!(identity.email.as_deref(), Some("a@luna.app"));
    }

    #[test]
    fn test_profile_onboarding_defaults_to_false() {
        let profile: ProfileRecord = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert!(!profile.onboarding_completed);
        assert!(profile.display_name.is_none());
    }

    #[test]
    fn test_profile_onboarding_null_is_false() {
        let rows: Vec<ProfileRecord> =
            serde_json::from_str(r#"[{"id":"u1","onboarding_completed":null}]"#).unwrap();
        assert!(!rows[0].onboarding_completed);

        let rows: Vec<ProfileRecord> =
            serde_json::from_str(r#"[{"id":"u2","onboarding_completed":true}]"#).unwrap();
        assert!(rows[0].onboarding_completed);
    }
}
