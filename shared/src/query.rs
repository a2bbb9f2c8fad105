//! 以身份为键的查询工具
//!
//! - `QueryCache`: 带 TTL 的记忆化缓存，显式失效
//! - `QueryTracker`: 追踪一次异步查询的归属（键 + 代次 + 挂载状态），
//!   在结果返回时比对，丢弃过期或卸载后的结果

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Duration;

use crate::date::Timestamp;

// =========================================================
// QueryCache
// =========================================================

struct CacheEntry<V> {
    value: V,
    fetched_at: Timestamp,
}

pub struct QueryCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash, V> QueryCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// 仅返回仍在有效期内的条目
    pub fn get_fresh(&self, key: &K, now: Timestamp) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|e| now.since(e.fetched_at) < self.ttl)
            .map(|e| &e.value)
    }

    pub fn insert(&mut self, key: K, value: V, fetched_at: Timestamp) {
        self.entries.insert(key, CacheEntry { value, fetched_at });
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =========================================================
// QueryTracker
// =========================================================

/// 供界面读取的查询状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState<K, V> {
    /// 当前值所属的键
    pub key: Option<K>,
    pub value: V,
    pub loading: bool,
}

impl<K: PartialEq, V> QueryState<K, V> {
    pub fn idle(value: V) -> Self {
        Self {
            key: None,
            value,
            loading: false,
        }
    }

    /// 针对 `key` 的结果是否尚未就绪（含尚未发起查询的情况）
    pub fn is_pending_for(&self, key: Option<&K>) -> bool {
        match key {
            None => false,
            Some(key) => self.loading || self.key.as_ref() != Some(key),
        }
    }
}

/// 一次已发起查询的凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    key: K,
    generation: u64,
}

struct TrackerInner<K, V> {
    key: Option<K>,
    generation: u64,
    mounted: bool,
    state: QueryState<K, V>,
}

/// 单线程查询追踪句柄，克隆后共享同一状态
pub struct QueryTracker<K, V> {
    inner: Rc<RefCell<TrackerInner<K, V>>>,
}

impl<K, V> Clone for QueryTracker<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: Clone + PartialEq, V: Clone> QueryTracker<K, V> {
    pub fn new(initial: V) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TrackerInner {
                key: None,
                generation: 0,
                mounted: true,
                state: QueryState::idle(initial),
            })),
        }
    }

    /// 为 `key` 发起新查询；`key` 为空时回到 `idle` 且不发起查询
    ///
    /// 查询期间值重置为 `idle`，旧身份的结果不会残留。
    /// 任何仍在进行中的旧查询都会因代次变化而失效。
    pub fn begin(&self, key: Option<K>, idle: V) -> Option<Ticket<K>> {
        let mut inner = self.inner.borrow_mut();
        if !inner.mounted {
            return None;
        }
        inner.generation += 1;
        inner.key = key.clone();
        match key {
            Some(key) => {
                inner.state = QueryState {
                    key: Some(key.clone()),
                    value: idle,
                    loading: true,
                };
                Some(Ticket {
                    key,
                    generation: inner.generation,
                })
            }
            None => {
                inner.state = QueryState::idle(idle);
                None
            }
        }
    }

    /// 同一个键已在进行或已完成时不再发起
    pub fn begin_if_changed(&self, key: Option<K>, idle: V) -> Option<Ticket<K>> {
        {
            let inner = self.inner.borrow();
            if inner.generation > 0 && inner.key == key {
                return None;
            }
        }
        self.begin(key, idle)
    }

    /// 写入查询结果；返回 false 表示结果已过期被丢弃
    pub fn settle(&self, ticket: Ticket<K>, value: V) -> bool {
        let mut inner = self.inner.borrow_mut();
        let current = inner.mounted
            && inner.generation == ticket.generation
            && inner.key.as_ref() == Some(&ticket.key);
        if !current {
            return false;
        }
        inner.state = QueryState {
            key: Some(ticket.key),
            value,
            loading: false,
        };
        true
    }

    /// 卸载后所有结果都被丢弃
    pub fn unmount(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.mounted = false;
        inner.generation += 1;
    }

    pub fn snapshot(&self) -> QueryState<K, V> {
        self.inner.borrow().state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_respects_ttl() {
        let mut cache = QueryCache::new(Duration::from_secs(300));
        cache.insert("u1", 7, Timestamp::new(0));

        assert_eq!(cache.get_fresh(&"u1", Timestamp::new(299_999)), Some(&7));
        assert_eq!(cache.get_fresh(&"u1", Timestamp::new(300_000)), None);
        assert_eq!(cache.get_fresh(&"u2", Timestamp::new(0)), None);
    }

    #[test]
    fn test_cache_invalidate() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("u1", 1, Timestamp::new(0));
        assert!(cache.invalidate(&"u1"));
        assert!(!cache.invalidate(&"u1"));
        assert_eq!(cache.get_fresh(&"u1", Timestamp::new(1)), None);
    }

    #[test]
    fn test_begin_without_key_stays_idle() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        assert!(tracker.begin(None, 0).is_none());
        assert_eq!(tracker.snapshot(), QueryState::idle(0));
    }

    #[test]
    fn test_settle_applies_current_ticket() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        let ticket = tracker.begin(Some("u1"), 0).unwrap();
        assert!(tracker.snapshot().loading);

        assert!(tracker.settle(ticket, 3));
        assert_eq!(
            tracker.snapshot(),
            QueryState {
                key: Some("u1"),
                value: 3,
                loading: false
            }
        );
    }

    #[test]
    fn test_key_change_discards_stale_result() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        let stale = tracker.begin(Some("u1"), 0).unwrap();
        let fresh = tracker.begin(Some("u2"), 0).unwrap();

        assert!(!tracker.settle(stale, 1));
        assert!(tracker.snapshot().loading);
        assert!(tracker.settle(fresh, 2));
        assert_eq!(tracker.snapshot().value, 2);
    }

    #[test]
    fn test_sign_out_while_pending_discards_result() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        let pending = tracker.begin(Some("u1"), 0).unwrap();
        assert!(tracker.begin(None, 0).is_none());

        assert!(!tracker.settle(pending, 9));
        assert_eq!(tracker.snapshot(), QueryState::idle(0));
    }

    #[test]
    fn test_unmount_discards_everything() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        let ticket = tracker.begin(Some("u1"), 0).unwrap();
        tracker.unmount();

        assert!(!tracker.settle(ticket, 5));
        assert!(tracker.begin(Some("u1"), 0).is_none());
        assert!(tracker.begin_if_changed(Some("u2"), 0).is_none());
    }

    #[test]
    fn test_pending_until_key_matches() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        // 尚未发起查询时，对某个键而言仍是未就绪
        assert!(tracker.snapshot().is_pending_for(Some(&"u1")));
        assert!(!tracker.snapshot().is_pending_for(None));

        let ticket = tracker.begin(Some("u1"), 0).unwrap();
        tracker.settle(ticket, 1);
        assert!(!tracker.snapshot().is_pending_for(Some(&"u1")));
        assert!(tracker.snapshot().is_pending_for(Some(&"u2")));
    }

    #[test]
    fn test_begin_if_changed_dedupes_same_key() {
        let tracker = QueryTracker::<&str, u32>::new(0);
        let ticket = tracker.begin_if_changed(Some("u1"), 0).unwrap();
        // 进行中
        assert!(tracker.begin_if_changed(Some("u1"), 0).is_none());
        tracker.settle(ticket, 1);
        // 已完成
        assert!(tracker.begin_if_changed(Some("u1"), 0).is_none());
        // 键变化后重新发起
        assert!(tracker.begin_if_changed(Some("u2"), 0).is_some());
        assert_eq!(tracker.snapshot().key, Some("u2"));
    }
}
