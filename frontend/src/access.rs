//! 角色与引导状态的响应式接入
//!
//! 身份变化时重新查询；卸载或身份切换后返回的结果由 watcher 丢弃。

use leptos::prelude::*;
use leptos::task::spawn_local;
use luna_shared::Identity;
use luna_shared::date::SystemClock;
use luna_shared::onboarding::{OnboardingResolver, OnboardingState, OnboardingWatcher};
use luna_shared::role::{RoleResolver, RoleState, RoleWatcher};

use crate::api::{BackendClient, RestProfileStore, RestRoleStore};
use crate::auth::SessionContext;
use crate::config::ClientConfig;

type Roles = RoleWatcher<RestRoleStore, SystemClock>;
type Onboarding = OnboardingWatcher<RestProfileStore>;

#[derive(Clone, Copy)]
pub struct AccessContext {
    pub roles: ReadSignal<RoleState>,
    pub onboarding: ReadSignal<OnboardingState>,
    set_roles: WriteSignal<RoleState>,
    identity: Memo<Option<Identity>>,
    watchers: StoredValue<(Roles, Onboarding), LocalStorage>,
}

impl AccessContext {
    /// 强制重新查询当前身份的角色（跳过缓存）
    pub fn refetch_roles(&self) {
        let Some(identity) = self.identity.get_untracked() else {
            return;
        };
        let (roles, _) = self.watchers.get_value();
        let set_roles = self.set_roles;

        let Some(ticket) = roles.begin(Some(&identity)) else {
            return;
        };
        set_roles.set(roles.snapshot());
        spawn_local(async move {
            if let Some(state) = roles.complete(ticket, &identity, true).await {
                set_roles.set(state);
            }
        });
    }
}

pub fn provide_access(session: SessionContext, client: BackendClient, config: &ClientConfig) {
    let roles = RoleWatcher::new(RoleResolver::with_ttl(
        RestRoleStore(client.clone()),
        SystemClock,
        config.role_cache_ttl,
    ));
    let onboarding = OnboardingWatcher::new(OnboardingResolver::new(RestProfileStore(client)));

    let (role_state, set_roles) = signal(roles.snapshot());
    let (onboarding_state, set_onboarding) = signal(onboarding.snapshot());
    let watchers = StoredValue::new_local((roles, onboarding));
    let identity = session.identity();

    Effect::new(move |_| {
        let identity = identity.get();
        let (roles, onboarding) = watchers.get_value();

        if identity.is_none() {
            roles.resolver().clear();
        }

        let role_ticket = roles.begin(identity.as_ref());
        set_roles.set(roles.snapshot());
        let onboarding_ticket = onboarding.begin(identity.as_ref());
        set_onboarding.set(onboarding.snapshot());

        let Some(identity) = identity else {
            return;
        };

        if let Some(ticket) = role_ticket {
            let identity = identity.clone();
            spawn_local(async move {
                if let Some(state) = roles.complete(ticket, &identity, false).await {
                    set_roles.set(state);
                }
            });
        }
        if let Some(ticket) = onboarding_ticket {
            spawn_local(async move {
                if let Some(state) = onboarding.complete(ticket, &identity).await {
                    set_onboarding.set(state);
                }
            });
        }
    });

    on_cleanup(move || {
        if let Some((roles, onboarding)) = watchers.try_get_value() {
            roles.unmount();
            onboarding.unmount();
        }
    });

    provide_context(AccessContext {
        roles: role_state,
        onboarding: onboarding_state,
        set_roles,
        identity,
        watchers,
    });
}

pub fn use_access() -> AccessContext {
    use_context::<AccessContext>().expect("AccessContext should be provided")
}
