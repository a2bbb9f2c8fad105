//! 守卫组件
//!
//! 把会话、角色与引导状态汇总为 `GuardSnapshot`，交给 `luna_shared::guard`
//! 求值，再把决策映射为视图或跳转。

use leptos::prelude::*;
use luna_shared::guard::{
    GuardDecision, GuardSnapshot, authenticated_guard, role_gated_guard, root_entry_guard,
};

use crate::access::use_access;
use crate::auth::use_session;
use crate::config::ClientConfig;
use crate::web::platform::current_platform;
use crate::web::router::{Link, use_router};

/// 读取当前所有守卫输入（响应式）
fn guard_snapshot() -> impl Fn() -> GuardSnapshot + Copy + Send + Sync + 'static {
    let session = use_session();
    let access = use_access();
    let breakpoint = use_context::<ClientConfig>()
        .map(|c| c.mobile_breakpoint)
        .unwrap_or(luna_shared::platform::DEFAULT_MOBILE_BREAKPOINT);

    move || {
        GuardSnapshot::assemble(
            session.state.get(),
            access.roles.get(),
            access.onboarding.get(),
            current_platform(breakpoint),
        )
    }
}

/// 执行跳转并渲染决策
fn guard_view(decision: Memo<GuardDecision>, children: Option<ChildrenFn>) -> impl IntoView {
    let router = use_router();

    Effect::new(move |_| {
        if let GuardDecision::Redirect(redirect) = decision.get() {
            router.redirect(&redirect.href());
        }
    });

    move || match decision.get() {
        GuardDecision::Loading(reason) => view! { <LoadingScreen message=reason.message() /> }.into_any(),
        GuardDecision::Redirect(_) => view! { <LoadingScreen message="Loading..." /> }.into_any(),
        GuardDecision::Denied => view! { <AccessDenied /> }.into_any(),
        GuardDecision::RenderChildren => match &children {
            Some(children) => children().into_any(),
            None => ().into_any(),
        },
    }
}

/// `/` 入口：只负责分流，本身不渲染内容
#[component]
pub fn RootGuard() -> impl IntoView {
    let snapshot = guard_snapshot();
    let decision = Memo::new(move |_| root_entry_guard(&snapshot()));
    guard_view(decision, None)
}

/// 需要登录的页面
#[component]
pub fn ProtectedRoute(children: ChildrenFn) -> impl IntoView {
    let snapshot = guard_snapshot();
    let location = use_router().location();
    let decision = Memo::new(move |_| {
        let location = location.with_untracked(|l| l.full_path());
        authenticated_guard(&snapshot(), &location)
    });
    guard_view(decision, Some(children))
}

/// 需要 admin 或 moderator 的页面
#[component]
pub fn AdminRoute(children: ChildrenFn) -> impl IntoView {
    let snapshot = guard_snapshot();
    let location = use_router().location();
    let decision = Memo::new(move |_| {
        let location = location.with_untracked(|l| l.full_path());
        role_gated_guard(&snapshot(), &location)
    });
    guard_view(decision, Some(children))
}

#[component]
pub fn LoadingScreen(#[prop(into)] message: String) -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center min-h-screen gap-4 bg-base-200">
            <span class="loading loading-spinner loading-lg text-primary"></span>
            <p class="text-base-content/70">{message}</p>
        </div>
    }
}

#[component]
pub fn AccessDenied() -> impl IntoView {
    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center">
                <h1 class="text-4xl font-bold text-error">"Access denied"</h1>
                <p class="text-base-content/70 mt-4">
                    "You don't have permission to view this page."
                </p>
                <Link to="/" class="btn btn-primary mt-6">"Go home"</Link>
            </div>
        </div>
    }
}
