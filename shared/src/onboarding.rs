//! 引导（onboarding）完成状态解析

use std::rc::Rc;

use async_trait::async_trait;

use crate::error::LunaResult;
use crate::query::{QueryState, QueryTracker, Ticket};
use crate::{Identity, IdentityId, ProfileRecord};

/// 资料存储：缺失的行是合法响应（`Ok(None)`）
#[async_trait(?Send)]
pub trait ProfileStore {
    async fn get_profile(&self, identity_id: &IdentityId) -> LunaResult<Option<ProfileRecord>>;
}

/// `None` 表示尚未确定；一旦查询过，结果只会是 `Some`
pub struct OnboardingResolver<S> {
    store: S,
}

impl<S: ProfileStore> OnboardingResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, identity: Option<&Identity>) -> Option<bool> {
        let identity = identity?;
        let completed = match self.store.get_profile(&identity.id).await {
            Ok(Some(profile)) => profile.onboarding_completed,
            Ok(None) => false,
            Err(e) => {
                log::warn!(
                    "[Onboarding] Failed to fetch profile for {}: {}",
                    identity.id,
                    e.in_op_with("onboarding.resolve", identity.id.as_str())
                );
                false
            }
        };
        Some(completed)
    }
}

pub type OnboardingState = QueryState<IdentityId, Option<bool>>;

/// 每次挂载对每个身份只查询一次，身份变化时才重新查询
pub struct OnboardingWatcher<S> {
    resolver: Rc<OnboardingResolver<S>>,
    tracker: QueryTracker<IdentityId, Option<bool>>,
}

impl<S> Clone for OnboardingWatcher<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<S: ProfileStore> OnboardingWatcher<S> {
    pub fn new(resolver: OnboardingResolver<S>) -> Self {
        Self {
            resolver: Rc::new(resolver),
            tracker: QueryTracker::new(None),
        }
    }

    pub fn begin(&self, identity: Option<&Identity>) -> Option<Ticket<IdentityId>> {
        self.tracker
            .begin_if_changed(identity.map(|i| i.id.clone()), None)
    }

    pub async fn complete(
        &self,
        ticket: Ticket<IdentityId>,
        identity: &Identity,
    ) -> Option<OnboardingState> {
        let completed = self.resolver.resolve(Some(identity)).await;
        if self.tracker.settle(ticket, completed) {
            Some(self.tracker.snapshot())
        } else {
            log::debug!("[Onboarding] Discarded stale result for {}", identity.id);
            None
        }
    }

    pub fn snapshot(&self) -> OnboardingState {
        self.tracker.snapshot()
    }

    pub fn unmount(&self) {
        self.tracker.unmount();
    }
}
