use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use gloo_net::http::Request;
use luna_shared::error::{LunaError, LunaResult};
use luna_shared::onboarding::ProfileStore;
use luna_shared::protocol::{ApiRequest, GetProfileRequest, HttpMethod, ListRolesRequest};
use luna_shared::role::{RoleAssignment, RoleStore};
use luna_shared::{HEADER_API_KEY, HEADER_AUTHORIZATION, IdentityId, ProfileRecord};

use crate::config::ClientConfig;

/// 托管后端的 HTTP 客户端（REST + Auth）
///
/// 克隆后共享同一个访问令牌。
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    anon_key: String,
    access_token: Rc<RefCell<Option<String>>>,
}

impl BackendClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: Rc::new(RefCell::new(None)),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 登录后设置，登出后清除；未设置时以匿名 key 访问
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.borrow_mut() = token;
    }

    fn bearer(&self) -> String {
        let token = self
            .access_token
            .borrow()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        format!("Bearer {}", token)
    }

    /// 发送请求并解析 JSON 响应
    pub async fn send<R: ApiRequest>(&self, req: &R) -> LunaResult<R::Response> {
        let url = self.url(R::PATH);
        let query = req.query();
        let builder = match R::METHOD {
            HttpMethod::Get => Request::get(&url),
            HttpMethod::Post => Request::post(&url),
        };
        let builder = builder
            .query(query.iter().map(|(k, v)| (*k, v.as_str())))
            .header(HEADER_API_KEY, &self.anon_key)
            .header(HEADER_AUTHORIZATION, &self.bearer())
            .header("Content-Type", "application/json");

        let request = match req.body()? {
            Some(body) => builder.body(body),
            None => builder.build(),
        }
        .map_err(|e| LunaError::invalid_input(e.to_string()).in_op_with("http.build", R::PATH))?;

        let res = request
            .send()
            .await
            .map_err(|e| LunaError::network(e.to_string()).in_op_with("http.send", R::PATH))?;

        let ok = res.ok();
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| LunaError::network(e.to_string()).in_op_with("http.read", R::PATH))?;

        if !ok {
            return Err(LunaError::from_response(status, &text).in_op_with("http.status", R::PATH));
        }

        let text = if R::HAS_BODY && !text.trim().is_empty() {
            text
        } else {
            "null".to_string()
        };
        serde_json_wasm::from_str::<R::Response>(&text)
            .map_err(|e| LunaError::serialization(e.to_string()).in_op_with("http.parse", R::PATH))
    }
}

// =========================================================
// 存储适配器
// =========================================================

/// `user_roles` 表
pub struct RestRoleStore(pub BackendClient);

#[async_trait(?Send)]
impl RoleStore for RestRoleStore {
    async fn get_roles(&self, identity_id: &IdentityId) -> LunaResult<Vec<RoleAssignment>> {
        let req = ListRolesRequest {
            user_id: identity_id.clone(),
        };
        self.0
            .send(&req)
            .await
            .map_err(|e| e.in_op_with("roles.fetch", identity_id.as_str()))
    }
}

/// `profiles` 表
pub struct RestProfileStore(pub BackendClient);

#[async_trait(?Send)]
impl ProfileStore for RestProfileStore {
    async fn get_profile(&self, identity_id: &IdentityId) -> LunaResult<Option<ProfileRecord>> {
        let req = GetProfileRequest {
            id: identity_id.clone(),
        };
        self.0
            .send(&req)
            .await
            .map(|rows| rows.into_iter().next())
            .map_err(|e| e.in_op_with("profiles.fetch", identity_id.as_str()))
    }
}
