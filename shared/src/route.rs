//! 路由定义模块 - 领域模型
//!
//! 纯粹的业务逻辑层，不依赖于 DOM 或 web_sys。

use std::fmt::Display;

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 入口（按平台与会话状态分流）
    #[default]
    Index,
    /// 营销落地页
    Landing,
    /// 登录/注册
    Auth,
    /// 首次引导
    Onboarding,
    /// 聊天主界面
    Chat,
    /// 个人设置（需要登录）
    Settings,
    /// 管理后台（需要 admin 或 moderator）
    Admin,
    /// 页面未找到
    NotFound,
}

/// 路由的访问级别，决定使用哪个守卫
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// 入口守卫
    Entry,
    Public,
    Authenticated,
    RoleGated,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举（忽略查询串与结尾斜杠）
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("/");
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Self::Index,
            "/landing" => Self::Landing,
            "/auth" => Self::Auth,
            "/onboarding" => Self::Onboarding,
            "/chat" => Self::Chat,
            "/settings" => Self::Settings,
            "/admin" => Self::Admin,
            _ => Self::NotFound,
        }
    }

    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Index => "/",
            Self::Landing => "/landing",
            Self::Auth => "/auth",
            Self::Onboarding => "/onboarding",
            Self::Chat => "/chat",
            Self::Settings => "/settings",
            Self::Admin => "/admin",
            Self::NotFound => "/404",
        }
    }

    /// **核心守卫映射：每个路由由哪个守卫把关**
    pub fn access(&self) -> RouteAccess {
        match self {
            Self::Index => RouteAccess::Entry,
            Self::Landing | Self::Auth | Self::NotFound => RouteAccess::Public,
            Self::Onboarding | Self::Chat | Self::Settings => RouteAccess::Authenticated,
            Self::Admin => RouteAccess::RoleGated,
        }
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

// =========================================================
// 重定向
// =========================================================

/// 守卫产生的跳转目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: AppRoute,
    /// 来源位置，登录后据此返回
    pub from: Option<String>,
}

impl Redirect {
    pub fn to(target: AppRoute) -> Self {
        Self { target, from: None }
    }

    pub fn with_from(target: AppRoute, from: impl Into<String>) -> Self {
        Self {
            target,
            from: Some(from.into()),
        }
    }

    /// 浏览器地址：`/auth?from=%2Fsettings`
    pub fn href(&self) -> String {
        match &self.from {
            Some(from) => format!(
                "{}?from={}",
                self.target.to_path(),
                urlencoding::encode(from)
            ),
            None => self.target.to_path().to_string(),
        }
    }
}

/// 从查询串中取出 `from` 参数并校验
pub fn return_path_from_query(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "from")
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .and_then(|v| sanitize_return_path(&v))
}

/// 只接受站内绝对路径，拒绝 `//host`、带协议的地址以及登录页本身
pub fn sanitize_return_path(path: &str) -> Option<String> {
    let valid = path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && !path.contains("://")
        && AppRoute::from_path(path) != AppRoute::Auth;
    valid.then(|| path.to_string())
}
