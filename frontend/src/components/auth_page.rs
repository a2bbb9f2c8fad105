use crate::auth::{login, use_session};
use crate::components::guards::LoadingScreen;
use crate::web::router::use_router;
use leptos::prelude::*;
use leptos::task::spawn_local;
use luna_shared::route::{AppRoute, return_path_from_query};

#[component]
pub fn AuthPage() -> impl IntoView {
    let session = use_session();
    let router = use_router();
    let location = router.location();

    let (email, set_email) = signal(String::new());
    let (password, set_password) = signal(String::new());
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);

    // 已登录（包括刚刚登录成功）时返回来源页面
    Effect::new(move |_| {
        let state = session.state.get();
        if !state.loading && state.is_authenticated() {
            let target = location
                .with_untracked(|l| return_path_from_query(&l.query))
                .unwrap_or_else(|| AppRoute::Index.to_path().to_string());
            router.redirect(&target);
        }
    });

    let is_loading = move || session.state.with(|s| s.loading);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        let (email, password) = (email.get_untracked(), password.get_untracked());
        if email.trim().is_empty() || password.is_empty() {
            set_error_msg.set(Some("Please fill in all fields".to_string()));
            return;
        }

        set_is_submitting.set(true);
        set_error_msg.set(None);

        spawn_local(async move {
            if let Err(message) = login(session, email.trim().to_string(), password).await {
                set_error_msg.set(Some(message));
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <Show when=move || !is_loading() fallback=|| view! { <LoadingScreen message="Loading..." /> }>
            <div class="hero min-h-screen bg-base-200">
                <div class="hero-content flex-col w-full max-w-md">
                    <div class="text-center mb-4">
                        <h1 class="text-3xl font-bold">"Welcome to Luna"</h1>
                        <p class="text-base-content/70">"Sign in to continue"</p>
                    </div>

                    <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                        <form class="card-body" on:submit=on_submit>
                            <Show when=move || error_msg.get().is_some()>
                                <div role="alert" class="alert alert-error text-sm py-2">
                                    <span>{move || error_msg.get().unwrap_or_default()}</span>
                                </div>
                            </Show>

                            <div class="form-control">
                                <label class="label" for="email">
                                    <span class="label-text">"Email"</span>
                                </label>
                                <input
                                    id="email"
                                    type="email"
                                    autocomplete="email"
                                    on:input=move |ev| set_email.set(event_target_value(&ev))
                                    prop:value=email
                                    class="input input-bordered"
                                    required
                                />
                            </div>
                            <div class="form-control">
                                <label class="label" for="password">
                                    <span class="label-text">"Password"</span>
                                </label>
                                <input
                                    id="password"
                                    type="password"
                                    autocomplete="current-password"
                                    on:input=move |ev| set_password.set(event_target_value(&ev))
                                    prop:value=password
                                    class="input input-bordered"
                                    required
                                />
                            </div>
                            <div class="form-control mt-6">
                                <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                    {move || if is_submitting.get() {
                                        view! { <span class="loading loading-spinner"></span> "Signing in..." }.into_any()
                                    } else {
                                        "Sign in".into_any()
                                    }}
                                </button>
                            </div>
                        </form>
                    </div>
                </div>
            </div>
        </Show>
    }
}
