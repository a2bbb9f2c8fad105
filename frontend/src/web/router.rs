//! 路由服务模块
//!
//! 封装了 web_sys 的 History API，所有对 window.history 的操作都集中在此模块。
//! 路由本身不做鉴权，访问控制交给 `components::guards` 中的守卫组件。

use leptos::prelude::*;
use luna_shared::route::AppRoute;
use wasm_bindgen::prelude::*;

/// 浏览器当前位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    /// 包含前导 `?`，没有查询串时为空
    pub query: String,
}

impl Location {
    fn read() -> Self {
        let location = web_sys::window().map(|w| w.location());
        let path = location
            .as_ref()
            .and_then(|l| l.pathname().ok())
            .unwrap_or_else(|| "/".to_string());
        let query = location
            .as_ref()
            .and_then(|l| l.search().ok())
            .unwrap_or_default();
        Self { path, query }
    }

    fn parse(href: &str) -> Self {
        match href.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                query: format!("?{}", query),
            },
            None => Self {
                path: href.to_string(),
                query: String::new(),
            },
        }
    }

    pub fn route(&self) -> AppRoute {
        AppRoute::from_path(&self.path)
    }

    /// 路径 + 查询串，作为登录后的返回位置
    pub fn full_path(&self) -> String {
        format!("{}{}", self.path, self.query)
    }
}

fn push_history_state(href: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(href));
        }
    }
}

/// 用于重定向，不留下历史记录
fn replace_history_state(href: &str) {
    if let Some(window) = web_sys::window() {
        if let Ok(history) = window.history() {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(href));
        }
    }
}

/// 路由器服务
///
/// 通过 Signal 驱动界面更新。
#[derive(Clone, Copy)]
pub struct RouterService {
    location: ReadSignal<Location>,
    set_location: WriteSignal<Location>,
}

impl RouterService {
    fn new() -> Self {
        let (location, set_location) = signal(Location::read());
        Self {
            location,
            set_location,
        }
    }

    pub fn location(&self) -> ReadSignal<Location> {
        self.location
    }

    /// 当前路由（仅在路由变化时通知）
    pub fn current_route(&self) -> Memo<AppRoute> {
        let location = self.location;
        Memo::new(move |_| location.with(Location::route))
    }

    /// 用户发起的导航，写入历史记录
    pub fn navigate(&self, href: &str) {
        log::debug!("[Router] Navigate to {}", href);
        push_history_state(href);
        self.set_location.set(Location::parse(href));
    }

    /// 守卫发起的跳转，替换当前历史记录
    pub fn redirect(&self, href: &str) {
        if self.location.with_untracked(|l| l.full_path() == href) {
            return;
        }
        log::info!("[Router] Redirecting to {}", href);
        replace_history_state(href);
        self.set_location.set(Location::parse(href));
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let set_location = self.set_location;

        let closure = Closure::<dyn Fn()>::new(move || {
            set_location.set(Location::read());
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }
}

fn provide_router() -> RouterService {
    let router = RouterService::new();
    router.init_popstate_listener();
    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
///
/// 提供路由上下文，应在 App 根部使用。
#[component]
pub fn Router(children: Children) -> impl IntoView {
    provide_router();
    children()
}

/// 路由出口组件
///
/// 根据当前路由渲染对应的组件；同一路由内仅查询串变化时不重建视图。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let route = use_router().current_route();

    move || matcher(route.get())
}

/// 站内链接，拦截默认跳转改走 History API
#[component]
pub fn Link(
    #[prop(into)] to: String,
    #[prop(optional, into)] class: String,
    children: Children,
) -> impl IntoView {
    let router = use_router();

    let target = to.clone();
    let on_click = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        router.navigate(&target);
    };

    view! {
        <a href=to class=class on:click=on_click>
            {children()}
        </a>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_query() {
        let location = Location::parse("/auth?from=%2Fsettings");
        assert_eq!(location.path, "/auth");
        assert_eq!(location.query, "?from=%2Fsettings");
        assert_eq!(location.route(), AppRoute::Auth);
        assert_eq!(location.full_path(), "/auth?from=%2Fsettings");
    }

    #[test]
    fn test_parse_without_query() {
        let location = Location::parse("/chat");
        assert_eq!(location.query, "");
        assert_eq!(location.full_path(), "/chat");
        assert_eq!(location.route(), AppRoute::Chat);
    }
}
