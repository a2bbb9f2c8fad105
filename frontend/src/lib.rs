//! Luna 前端应用
//!
//! 采用 Context-Driven 架构，决策逻辑全部在 `luna_shared` 中：
//! - `web::router`: History API 路由服务
//! - `auth`: 会话与身份提供方
//! - `access`: 角色与引导状态
//! - `components::guards`: 路由守卫
//! - `components`: UI 组件层

mod access;
mod api;
mod auth;
mod config;
mod components {
    pub mod auth_page;
    pub mod guards;
    pub mod offline_banner;
    pub mod pages;
}
mod web;

use crate::access::provide_access;
use crate::api::BackendClient;
use crate::auth::{BackendAuth, SessionContext, init_session};
use crate::components::auth_page::AuthPage;
use crate::components::guards::{AdminRoute, ProtectedRoute, RootGuard};
use crate::components::offline_banner::OfflineBanner;
use crate::components::pages::{
    AdminPage, ChatPage, LandingPage, NotFoundPage, OnboardingPage, SettingsPage,
};
use crate::config::ClientConfig;

use leptos::prelude::*;
use luna_shared::route::{AppRoute, RouteAccess};
use web::connectivity::provide_connectivity;
use web::router::{Router, RouterOutlet};

fn page(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Index => view! { <RootGuard /> }.into_any(),
        AppRoute::Landing => view! { <LandingPage /> }.into_any(),
        AppRoute::Auth => view! { <AuthPage /> }.into_any(),
        AppRoute::Onboarding => view! { <OnboardingPage /> }.into_any(),
        AppRoute::Chat => view! { <ChatPage /> }.into_any(),
        AppRoute::Settings => view! { <SettingsPage /> }.into_any(),
        AppRoute::Admin => view! { <AdminPage /> }.into_any(),
        AppRoute::NotFound => view! { <NotFoundPage /> }.into_any(),
    }
}

/// 路由匹配函数
///
/// 按路由的访问级别包裹对应的守卫。
fn route_matcher(route: AppRoute) -> AnyView {
    match route.access() {
        RouteAccess::Entry | RouteAccess::Public => page(route),
        RouteAccess::Authenticated => view! {
            <ProtectedRoute>{move || page(route)}</ProtectedRoute>
        }
        .into_any(),
        RouteAccess::RoleGated => view! {
            <AdminRoute>{move || page(route)}</AdminRoute>
        }
        .into_any(),
    }
}

#[component]
pub fn App() -> impl IntoView {
    let config = ClientConfig::load();
    log::info!("[App] Backend: {}", config.backend_url);

    // 1. 后端客户端（令牌在会话与数据查询间共享）
    let client = BackendClient::new(&config);

    // 2. 会话：恢复持久化的登录状态
    let session = SessionContext::new(BackendAuth::new(client.clone()));
    provide_context(session);
    init_session(&session);

    // 3. 角色与引导状态随身份变化自动查询
    provide_access(session, client, &config);
    provide_connectivity();
    provide_context(config);

    view! {
        <OfflineBanner />
        <Router>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
}
