//! 在线状态监听
//!
//! 状态机在 `luna_shared::connectivity`，这里只负责接入 `online` / `offline` 事件。

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use luna_shared::connectivity::{ConnectivityEvent, ConnectivityNotice, ConnectivityState};
use wasm_bindgen::prelude::*;

/// 恢复在线提示的显示时长
const BACK_ONLINE_NOTICE_MS: u32 = 3_000;

#[derive(Clone, Copy)]
pub struct ConnectivityContext {
    pub state: ReadSignal<ConnectivityState>,
    /// "已恢复连接" 提示是否可见
    pub back_online: ReadSignal<bool>,
}

fn initial_online() -> bool {
    web_sys::window()
        .map(|w| w.navigator().on_line())
        .unwrap_or(true)
}

/// 创建上下文并注册监听，只在应用根部调用一次
pub fn provide_connectivity() -> ConnectivityContext {
    let (state, set_state) = signal(ConnectivityState::new(initial_online()));
    let (back_online, set_back_online) = signal(false);
    // 连续恢复时只让最后一次的定时器生效
    let notice_seq = StoredValue::new(0u32);

    let handle = move |event: ConnectivityEvent| {
        let mut notice = None;
        set_state.update(|s| notice = s.apply(event));

        match notice {
            Some(ConnectivityNotice::WentOffline) => {
                log::warn!("[Network] Connection lost");
                set_back_online.set(false);
            }
            Some(ConnectivityNotice::BackOnline) => {
                log::info!("[Network] Connection restored");
                set_back_online.set(true);
                notice_seq.update_value(|n| *n = n.wrapping_add(1));
                let seq = notice_seq.get_value();
                Timeout::new(BACK_ONLINE_NOTICE_MS, move || {
                    if notice_seq.try_get_value() == Some(seq) {
                        set_back_online.set(false);
                    }
                })
                .forget();
            }
            None => {}
        }
    };

    if let Some(window) = web_sys::window() {
        for (name, event) in [
            ("online", ConnectivityEvent::Online),
            ("offline", ConnectivityEvent::Offline),
        ] {
            let closure = Closure::<dyn Fn()>::new(move || handle(event));
            let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            // 泄漏闭包以保持监听器存活
            closure.forget();
        }
    }

    let ctx = ConnectivityContext { state, back_online };
    provide_context(ctx);
    ctx
}

pub fn use_connectivity() -> ConnectivityContext {
    use_context::<ConnectivityContext>().expect("ConnectivityContext should be provided")
}
