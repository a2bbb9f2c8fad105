//! 读取浏览器环境信号，交给 `luna_shared::platform` 分类

use luna_shared::platform::{Platform, PlatformSignals};
use wasm_bindgen::{JsCast, JsValue};

/// 原生壳注入的全局对象
const NATIVE_BRIDGE: &str = "Capacitor";

fn read_signals() -> PlatformSignals {
    let Some(window) = web_sys::window() else {
        return PlatformSignals::default();
    };

    let viewport_width = window
        .inner_width()
        .ok()
        .and_then(|w| w.as_f64())
        .map(|w| w as u32);

    let user_agent = window.navigator().user_agent().unwrap_or_default();

    let standalone_display = window
        .match_media("(display-mode: standalone)")
        .ok()
        .flatten()
        .is_some_and(|mq| mq.matches());

    PlatformSignals {
        viewport_width,
        user_agent,
        standalone_display,
        native_runtime: native_runtime(&window),
    }
}

/// `window.Capacitor.isNativePlatform()`，桥接不存在时为 false
fn native_runtime(window: &web_sys::Window) -> bool {
    let Ok(bridge) = js_sys::Reflect::get(window, &JsValue::from_str(NATIVE_BRIDGE)) else {
        return false;
    };
    if bridge.is_undefined() || bridge.is_null() {
        return false;
    }
    js_sys::Reflect::get(&bridge, &JsValue::from_str("isNativePlatform"))
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
        .and_then(|f| f.call0(&bridge).ok())
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// 每次求值时重新读取，不缓存
pub fn current_platform(breakpoint: u32) -> Platform {
    Platform::classify_with_breakpoint(&read_signals(), breakpoint)
}
