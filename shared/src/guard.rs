//! 路由守卫决策
//!
//! 三种守卫都是快照上的纯函数，没有隐藏状态；
//! 渲染层只负责把 `GuardDecision` 映射为视图或跳转。

use crate::Identity;
use crate::onboarding::OnboardingState;
use crate::platform::Platform;
use crate::role::{RoleSet, RoleState};
use crate::route::{AppRoute, Redirect};
use crate::session::SessionState;

/// 守卫求值所需的全部输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSnapshot {
    pub identity: Option<Identity>,
    pub session_loading: bool,
    pub roles: RoleSet,
    pub role_loading: bool,
    /// `None` 表示尚未确定
    pub onboarding: Option<bool>,
    pub platform: Platform,
}

impl GuardSnapshot {
    /// 由各状态源组装快照
    ///
    /// 查询结果只对其所属身份有效：键与当前身份不一致时，
    /// 角色视为加载中，引导状态视为未确定。
    pub fn assemble(
        session: SessionState,
        roles: RoleState,
        onboarding: OnboardingState,
        platform: Platform,
    ) -> Self {
        let id = session.identity.as_ref().map(|i| &i.id);
        let role_loading = roles.is_pending_for(id);
        let onboarding = if onboarding.is_pending_for(id) {
            None
        } else {
            onboarding.value
        };

        Self {
            session_loading: session.loading,
            roles: roles.value,
            role_loading,
            onboarding,
            platform,
            identity: session.identity,
        }
    }

    /// 已登录但引导状态尚未返回
    pub fn onboarding_in_flight(&self) -> bool {
        self.identity.is_some() && self.onboarding.is_none()
    }
}

/// 加载原因，决定等待界面的提示文案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingReason {
    Session,
    Onboarding,
    /// 角色校验中
    VerifyingAccess,
}

impl LoadingReason {
    pub fn message(&self) -> &'static str {
        match self {
            LoadingReason::Session | LoadingReason::Onboarding => "Loading...",
            LoadingReason::VerifyingAccess => "Verifying access...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Loading(LoadingReason),
    Redirect(Redirect),
    RenderChildren,
    /// 原地拒绝，不跳转
    Denied,
}

/// 入口守卫：按平台、会话与引导状态分流
pub fn root_entry_guard(s: &GuardSnapshot) -> GuardDecision {
    if s.session_loading {
        return GuardDecision::Loading(LoadingReason::Session);
    }
    if s.onboarding_in_flight() {
        return GuardDecision::Loading(LoadingReason::Onboarding);
    }
    // 桌面端即使已登录也进入落地页
    if s.platform.is_desktop_web() {
        return GuardDecision::Redirect(Redirect::to(AppRoute::Landing));
    }
    if s.identity.is_none() {
        return GuardDecision::Redirect(Redirect::to(AppRoute::Auth));
    }
    if s.onboarding == Some(false) {
        return GuardDecision::Redirect(Redirect::to(AppRoute::Onboarding));
    }
    GuardDecision::Redirect(Redirect::to(AppRoute::Chat))
}

/// 登录守卫：未登录时携带来源位置跳转到 `/auth`
pub fn authenticated_guard(s: &GuardSnapshot, location: &str) -> GuardDecision {
    if s.session_loading {
        return GuardDecision::Loading(LoadingReason::Session);
    }
    if s.identity.is_none() {
        return GuardDecision::Redirect(Redirect::with_from(AppRoute::Auth, location));
    }
    GuardDecision::RenderChildren
}

/// 角色守卫：在登录守卫之上要求 admin 或 moderator
pub fn role_gated_guard(s: &GuardSnapshot, location: &str) -> GuardDecision {
    match authenticated_guard(s, location) {
        GuardDecision::RenderChildren => {}
        other => return other,
    }
    if s.role_loading {
        return GuardDecision::Loading(LoadingReason::VerifyingAccess);
    }
    if !s.roles.is_admin_or_moderator() {
        return GuardDecision::Denied;
    }
    GuardDecision::RenderChildren
}
