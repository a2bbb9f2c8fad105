//! 页面外壳
//!
//! 实际内容由各自的功能模块提供，这里只保留路由可达的最小页面。

use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::access::use_access;
use crate::auth::{logout, use_session};
use crate::web::router::Link;

fn current_email() -> impl Fn() -> String + Copy + Send + Sync + 'static {
    let session = use_session();
    move || {
        session.state.with(|s| {
            s.identity
                .as_ref()
                .and_then(|i| i.email.clone())
                .unwrap_or_default()
        })
    }
}

#[component]
pub fn LandingPage() -> impl IntoView {
    let session = use_session();
    let signed_in = move || session.state.with(|s| s.is_authenticated());

    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content text-center">
                <div class="max-w-md">
                    <h1 class="text-5xl font-bold">"Luna"</h1>
                    <p class="py-6 text-base-content/70">
                        "Your companion, on every device."
                    </p>
                    <Show
                        when=signed_in
                        fallback=|| view! { <Link to="/auth" class="btn btn-primary">"Get started"</Link> }
                    >
                        <Link to="/chat" class="btn btn-primary">"Open chat"</Link>
                    </Show>
                </div>
            </div>
        </div>
    }
}

#[component]
pub fn OnboardingPage() -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center min-h-screen gap-4 bg-base-200">
            <h1 class="text-3xl font-bold">"Let's get you set up"</h1>
            <p class="text-base-content/70">"Tell Luna a little about yourself."</p>
        </div>
    }
}

#[component]
pub fn ChatPage() -> impl IntoView {
    view! {
        <div class="flex flex-col min-h-screen bg-base-100">
            <header class="navbar bg-base-200 px-4">
                <span class="text-xl font-bold flex-1">"Luna"</span>
                <Link to="/settings" class="btn btn-ghost btn-sm">"Settings"</Link>
            </header>
            <main class="flex-1 flex items-center justify-center text-base-content/60">
                "Say hello to start a conversation."
            </main>
        </div>
    }
}

#[component]
pub fn SettingsPage() -> impl IntoView {
    let session = use_session();
    let email = current_email();
    let (signing_out, set_signing_out) = signal(false);

    let on_logout = move |_: leptos::ev::MouseEvent| {
        set_signing_out.set(true);
        spawn_local(async move {
            logout(session).await;
            set_signing_out.set(false);
        });
    };

    view! {
        <div class="container mx-auto p-6 max-w-xl">
            <h1 class="text-2xl font-bold mb-6">"Settings"</h1>
            <div class="card bg-base-100 shadow">
                <div class="card-body">
                    <p>"Signed in as " <span class="font-mono">{email}</span></p>
                    <div class="card-actions justify-end">
                        <button
                            class="btn btn-outline btn-error"
                            on:click=on_logout
                            disabled=move || signing_out.get()
                        >
                            "Sign out"
                        </button>
                    </div>
                </div>
            </div>
        </div>
    }
}

#[component]
pub fn AdminPage() -> impl IntoView {
    let access = use_access();
    let roles = move || {
        access.roles.with(|s| {
            s.value
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
    };
    let refreshing = move || access.roles.with(|s| s.loading);

    view! {
        <div class="container mx-auto p-6">
            <h1 class="text-2xl font-bold mb-2">"Admin"</h1>
            <p class="text-base-content/70 mb-6">"Roles: " {roles}</p>
            <button
                class="btn btn-sm"
                on:click=move |_| access.refetch_roles()
                disabled=refreshing
            >
                "Refresh access"
            </button>
        </div>
    }
}

#[component]
pub fn NotFoundPage() -> impl IntoView {
    view! {
        <div class="flex items-center justify-center min-h-screen bg-base-200">
            <div class="text-center">
                <h1 class="text-6xl font-bold text-error">"404"</h1>
                <p class="text-xl mt-4">"Page not found"</p>
                <Link to="/" class="btn btn-ghost mt-6">"Go home"</Link>
            </div>
        </div>
    }
}
