//! 会话状态
//!
//! 身份提供方推送的事件投影为 `SessionState`。`loading` 只在首次
//! 解析前为 true，之后不会再回到 true。

use std::time::Duration;

use async_trait::async_trait;

use crate::Identity;
use crate::date::Timestamp;
use crate::error::{LunaErrorStatus, LunaResult};

/// 在过期前多久刷新访问令牌
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// 刷新暂时失败（如离线）后的重试间隔
pub const REFRESH_RETRY: Duration = Duration::from_secs(30);
/// 两次刷新之间的最短间隔
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// 身份提供方推送的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// 启动时恢复的会话（可能为空）
    InitialSession(Option<Identity>),
    SignedIn(Identity),
    TokenRefreshed(Identity),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::bootstrapping()
    }
}

impl SessionState {
    pub fn bootstrapping() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    /// 应用事件，返回身份 id 是否发生变化
    pub fn apply(&mut self, event: AuthEvent) -> bool {
        let before = self.identity.as_ref().map(|i| i.id.clone());
        match event {
            AuthEvent::InitialSession(identity) => self.identity = identity,
            AuthEvent::SignedIn(identity) | AuthEvent::TokenRefreshed(identity) => {
                self.identity = Some(identity)
            }
            AuthEvent::SignedOut => self.identity = None,
        }
        self.loading = false;
        before != self.identity.as_ref().map(|i| i.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// 外部身份提供方
#[async_trait(?Send)]
pub trait IdentityProvider {
    /// 恢复已持久化的会话；没有会话时返回 `Ok(None)`
    async fn restore(&self) -> LunaResult<Option<Identity>>;
    async fn sign_in(&self, email: &str, password: &str) -> LunaResult<Identity>;
    async fn sign_out(&self) -> LunaResult<()>;
    /// 用刷新令牌换取新的访问令牌；没有会话时返回 `Ok(None)`
    async fn refresh(&self) -> LunaResult<Option<Identity>>;
    /// 当前访问令牌的过期时间
    fn session_expiry(&self) -> Option<Timestamp>;
}

/// 一次令牌刷新的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(Identity),
    /// 刷新令牌被拒绝，会话结束
    Rejected,
    /// 暂时失败，稍后重试
    Retry,
    NoSession,
}

impl RefreshOutcome {
    /// 需要投递给 `SessionState` 的事件
    pub fn event(&self) -> Option<AuthEvent> {
        match self {
            RefreshOutcome::Refreshed(identity) => Some(AuthEvent::TokenRefreshed(identity.clone())),
            RefreshOutcome::Rejected => Some(AuthEvent::SignedOut),
            RefreshOutcome::Retry | RefreshOutcome::NoSession => None,
        }
    }
}

/// 后端明确拒绝刷新令牌（而非暂时不可用）
pub fn is_refresh_rejection(status: LunaErrorStatus) -> bool {
    matches!(
        status,
        LunaErrorStatus::Unauthorized | LunaErrorStatus::InvalidInput
    )
}

/// 刷新访问令牌；被拒绝时会话结束，其余失败稍后重试
pub async fn refresh<P: IdentityProvider + ?Sized>(provider: &P) -> RefreshOutcome {
    match provider.refresh().await {
        Ok(Some(identity)) => RefreshOutcome::Refreshed(identity),
        Ok(None) => RefreshOutcome::NoSession,
        Err(e) if is_refresh_rejection(e.status) => {
            log::info!("[Session] Token refresh rejected: {}", e.in_op("session.refresh"));
            RefreshOutcome::Rejected
        }
        Err(e) => {
            log::warn!("[Session] Token refresh failed, will retry: {}", e);
            RefreshOutcome::Retry
        }
    }
}

/// 距下一次刷新的等待时间：过期前 `REFRESH_MARGIN`，不少于 5 秒
pub fn next_refresh_delay(expires_at: Timestamp, now: Timestamp) -> Duration {
    expires_at
        .since(now + REFRESH_MARGIN)
        .max(MIN_REFRESH_DELAY)
}

/// 启动引导：提供方失败时按匿名处理
pub async fn bootstrap<P: IdentityProvider + ?Sized>(provider: &P) -> AuthEvent {
    match provider.restore().await {
        Ok(identity) => AuthEvent::InitialSession(identity),
        Err(e) => {
            log::warn!("[Session] Failed to restore session: {}", e.in_op("session.bootstrap"));
            AuthEvent::InitialSession(None)
        }
    }
}

/// 登出：无论提供方是否成功，本地状态都回到匿名
pub async fn sign_out<P: IdentityProvider + ?Sized>(provider: &P) -> AuthEvent {
    if let Err(e) = provider.sign_out().await {
        log::warn!("[Session] Sign-out request failed: {}", e.in_op("session.sign_out"));
    }
    AuthEvent::SignedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LunaError;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum TokenEndpoint {
        #[default]
        Accepts,
        Rejects,
        Offline,
        Unavailable,
    }

    #[derive(Default)]
    struct TestProvider {
        stored: RefCell<Option<Identity>>,
        fail: Cell<bool>,
        token_endpoint: Cell<TokenEndpoint>,
        expires_at: Cell<Option<Timestamp>>,
        refreshes: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl IdentityProvider for TestProvider {
        async fn restore(&self) -> LunaResult<Option<Identity>> {
            if self.fail.get() {
                return Err(LunaError::network("offline"));
            }
            Ok(self.stored.borrow().clone())
        }

        async fn sign_in(&self, email: &str, _password: &str) -> LunaResult<Identity> {
            let identity = Identity {
                email: Some(email.to_string()),
                ..Identity::new("u1")
            };
            *self.stored.borrow_mut() = Some(identity.clone());
            Ok(identity)
        }

        async fn sign_out(&self) -> LunaResult<()> {
            *self.stored.borrow_mut() = None;
            if self.fail.get() {
                return Err(LunaError::network("offline"));
            }
            Ok(())
        }

        async fn refresh(&self) -> LunaResult<Option<Identity>> {
            self.refreshes.set(self.refreshes.get() + 1);
            match self.token_endpoint.get() {
                TokenEndpoint::Offline => Err(LunaError::network("offline")),
                TokenEndpoint::Unavailable => Err(LunaError::from_response(503, "")),
                TokenEndpoint::Rejects => {
                    *self.stored.borrow_mut() = None;
                    Err(LunaError::from_response(
                        400,
                        r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#,
                    ))
                }
                TokenEndpoint::Accepts => Ok(self.stored.borrow().clone()),
            }
        }

        fn session_expiry(&self) -> Option<Timestamp> {
            self.expires_at.get()
        }
    }

    fn signed_in_provider() -> (TestProvider, SessionState) {
        let provider = TestProvider::default();
        *provider.stored.borrow_mut() = Some(Identity::new("u1"));
        let mut state = SessionState::bootstrapping();
        state.apply(AuthEvent::InitialSession(Some(Identity::new("u1"))));
        (provider, state)
    }

    #[test]
    fn test_loading_clears_on_first_event() {
        let mut state = SessionState::bootstrapping();
        assert!(state.loading);
        state.apply(AuthEvent::InitialSession(None));
        assert!(!state.loading);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_loading_never_returns() {
        let mut state = SessionState::bootstrapping();
        let events = [
            AuthEvent::InitialSession(Some(Identity::new("u1"))),
            AuthEvent::TokenRefreshed(Identity::new("u1")),
            AuthEvent::SignedOut,
            AuthEvent::InitialSession(None),
            AuthEvent::SignedIn(Identity::new("u2")),
        ];
        for event in events {
            state.apply(event);
            assert!(!state.loading);
        }
        assert_eq!(state.identity, Some(Identity::new("u2")));
    }

    #[test]
    fn test_apply_reports_identity_change() {
        let mut state = SessionState::bootstrapping();
        assert!(state.apply(AuthEvent::InitialSession(Some(Identity::new("u1")))));
        assert!(!state.apply(AuthEvent::TokenRefreshed(Identity::new("u1"))));
        assert!(state.apply(AuthEvent::SignedIn(Identity::new("u2"))));
        assert!(state.apply(AuthEvent::SignedOut));
        assert_eq!(state, SessionState::signed_out());
    }

    #[tokio::test]
    async fn test_bootstrap_restores_identity() {
        let provider = TestProvider::default();
        *provider.stored.borrow_mut() = Some(Identity::new("u1"));
        assert_eq!(
            bootstrap(&provider).await,
            AuthEvent::InitialSession(Some(Identity::new("u1")))
        );
    }

    #[tokio::test]
    async fn test_bootstrap_failure_is_anonymous() {
        let provider = TestProvider::default();
        provider.fail.set(true);
        let mut state = SessionState::bootstrapping();
        state.apply(bootstrap(&provider).await);
        assert_eq!(state, SessionState::signed_out());
    }

    #[tokio::test]
    async fn test_sign_out_resets_even_on_failure() {
        let provider = TestProvider::default();
        let identity = provider.sign_in("a@luna.app", "pw").await.unwrap();
        let mut state = SessionState::bootstrapping();
        state.apply(AuthEvent::SignedIn(identity));

        provider.fail.set(true);
        state.apply(sign_out(&provider).await);
        assert_eq!(state, SessionState::signed_out());
    }

    #[tokio::test]
    async fn test_refresh_keeps_identity() {
        let (provider, mut state) = signed_in_provider();

        let outcome = refresh(&provider).await;
        assert_eq!(outcome, RefreshOutcome::Refreshed(Identity::new("u1")));

        let event = outcome.event().unwrap();
        assert_eq!(event, AuthEvent::TokenRefreshed(Identity::new("u1")));
        assert!(!state.apply(event));
        assert!(state.is_authenticated());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out() {
        let (provider, mut state) = signed_in_provider();
        provider.token_endpoint.set(TokenEndpoint::Rejects);

        let outcome = refresh(&provider).await;
        assert_eq!(outcome, RefreshOutcome::Rejected);
        assert!(state.apply(outcome.event().unwrap()));
        assert_eq!(state, SessionState::signed_out());
    }

    #[tokio::test]
    async fn test_offline_refresh_retries_without_event() {
        let (provider, state) = signed_in_provider();
        provider.token_endpoint.set(TokenEndpoint::Offline);

        let outcome = refresh(&provider).await;
        assert_eq!(outcome, RefreshOutcome::Retry);
        assert!(outcome.event().is_none());
        assert!(state.is_authenticated());
        assert_eq!(provider.refreshes.get(), 1);

        provider.token_endpoint.set(TokenEndpoint::Unavailable);
        assert_eq!(refresh(&provider).await, RefreshOutcome::Retry);
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let provider = TestProvider::default();
        let outcome = refresh(&provider).await;
        assert_eq!(outcome, RefreshOutcome::NoSession);
        assert!(outcome.event().is_none());
    }

    #[test]
    fn test_next_refresh_delay_before_expiry() {
        let now = Timestamp::new(1_000_000);
        let provider = TestProvider::default();
        provider.expires_at.set(Some(now + Duration::from_secs(3600)));

        let expires_at = provider.session_expiry().unwrap();
        assert_eq!(next_refresh_delay(expires_at, now), Duration::from_secs(3540));
    }

    #[test]
    fn test_next_refresh_delay_when_expired() {
        let now = Timestamp::new(10_000_000);
        assert_eq!(
            next_refresh_delay(Timestamp::new(9_000_000), now),
            MIN_REFRESH_DELAY
        );
        assert_eq!(
            next_refresh_delay(now + Duration::from_secs(30), now),
            MIN_REFRESH_DELAY
        );
    }
}
