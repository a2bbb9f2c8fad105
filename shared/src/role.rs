//! 角色模型与角色解析器

use std::cell::RefCell;
use std::rc::Rc;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date::Clock;
use crate::error::LunaResult;
use crate::query::{QueryCache, QueryState, QueryTracker, Ticket};
use crate::{Identity, IdentityId};

/// 角色缓存的默认有效期
pub const DEFAULT_ROLE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

// =========================================================
// 领域模型
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Moderator,
    User,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Moderator => "moderator",
            RoleName::User => "user",
        }
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `user_roles` 表中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    pub user_id: IdentityId,
    pub role: RoleName,
    pub created_at: DateTime<Utc>,
}

/// 某身份拥有的角色集合（集合语义，一人可多角色）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleSet(BTreeSet<RoleName>);

impl RoleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_assignments(rows: &[RoleAssignment]) -> Self {
        Self(rows.iter().map(|r| r.role).collect())
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.0.contains(&role)
    }

    pub fn is_admin_or_moderator(&self) -> bool {
        self.has_role(RoleName::Admin) || self.has_role(RoleName::Moderator)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoleName> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RoleName> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =========================================================
// 存储接口
// =========================================================

/// 角色存储：只读查询
#[async_trait(?Send)]
pub trait RoleStore {
    async fn get_roles(&self, identity_id: &IdentityId) -> LunaResult<Vec<RoleAssignment>>;
}

// =========================================================
// 角色解析器
// =========================================================

/// 按身份缓存角色集合，失败时退化为空集合（不授予任何额外权限）
pub struct RoleResolver<S, C> {
    store: S,
    clock: C,
    cache: RefCell<QueryCache<IdentityId, RoleSet>>,
}

impl<S: RoleStore, C: Clock> RoleResolver<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_ttl(store, clock, DEFAULT_ROLE_CACHE_TTL)
    }

    pub fn with_ttl(store: S, clock: C, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            cache: RefCell::new(QueryCache::new(ttl)),
        }
    }

    pub async fn resolve(&self, identity: Option<&Identity>) -> RoleSet {
        let Some(identity) = identity else {
            return RoleSet::empty();
        };

        let now = self.clock.now();
        if let Some(cached) = self.cache.borrow().get_fresh(&identity.id, now) {
            return cached.clone();
        }

        self.fetch(identity).await
    }

    /// 跳过缓存重新查询（管理员变更角色后使用）
    pub async fn refetch(&self, identity: &Identity) -> RoleSet {
        self.invalidate(&identity.id);
        self.fetch(identity).await
    }

    pub fn invalidate(&self, identity_id: &IdentityId) {
        self.cache.borrow_mut().invalidate(identity_id);
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    async fn fetch(&self, identity: &Identity) -> RoleSet {
        match self.store.get_roles(&identity.id).await {
            Ok(rows) => {
                let roles = RoleSet::from_assignments(&rows);
                self.cache
                    .borrow_mut()
                    .insert(identity.id.clone(), roles.clone(), self.clock.now());
                roles
            }
            Err(e) => {
                log::warn!(
                    "[Roles] Failed to fetch roles for {}: {}",
                    identity.id,
                    e.in_op_with("roles.resolve", identity.id.as_str())
                );
                RoleSet::empty()
            }
        }
    }
}

// =========================================================
// 角色观察器
// =========================================================

pub type RoleState = QueryState<IdentityId, RoleSet>;

/// 解析器 + 查询追踪：身份变化或卸载后返回的结果被丢弃
pub struct RoleWatcher<S, C> {
    resolver: Rc<RoleResolver<S, C>>,
    tracker: QueryTracker<IdentityId, RoleSet>,
}

impl<S, C> Clone for RoleWatcher<S, C> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<S: RoleStore, C: Clock> RoleWatcher<S, C> {
    pub fn new(resolver: RoleResolver<S, C>) -> Self {
        Self {
            resolver: Rc::new(resolver),
            tracker: QueryTracker::new(RoleSet::empty()),
        }
    }

    /// 同步进入加载状态，返回需要完成的查询凭据
    pub fn begin(&self, identity: Option<&Identity>) -> Option<Ticket<IdentityId>> {
        self.tracker
            .begin(identity.map(|i| i.id.clone()), RoleSet::empty())
    }

    /// 执行查询并在仍然有效时写入结果
    pub async fn complete(
        &self,
        ticket: Ticket<IdentityId>,
        identity: &Identity,
        force: bool,
    ) -> Option<RoleState> {
        let roles = if force {
            self.resolver.refetch(identity).await
        } else {
            self.resolver.resolve(Some(identity)).await
        };

        if self.tracker.settle(ticket, roles) {
            Some(self.tracker.snapshot())
        } else {
            log::debug!("[Roles] Discarded stale result for {}", identity.id);
            None
        }
    }

    pub fn snapshot(&self) -> RoleState {
        self.tracker.snapshot()
    }

    pub fn unmount(&self) {
        self.tracker.unmount();
    }

    pub fn resolver(&self) -> &RoleResolver<S, C> {
        &self.resolver
    }
}
