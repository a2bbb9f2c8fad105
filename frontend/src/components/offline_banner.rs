use leptos::prelude::*;

use crate::web::connectivity::use_connectivity;

/// 离线常驻横幅 + 恢复在线的短暂提示
#[component]
pub fn OfflineBanner() -> impl IntoView {
    let connectivity = use_connectivity();
    let offline = move || connectivity.state.with(|s| s.show_offline_banner());
    let back_online = move || connectivity.back_online.get();

    view! {
        <Show when=offline>
            <div role="status" class="fixed top-0 inset-x-0 z-50 alert alert-warning rounded-none justify-center py-2">
                "You're offline. Some features may be unavailable."
            </div>
        </Show>
        <Show when=back_online>
            <div class="toast toast-top toast-center z-50">
                <div class="alert alert-success py-2">"Back online"</div>
            </div>
        </Show>
    }
}
