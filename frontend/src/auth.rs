//! 会话模块
//!
//! 在应用根部构造一次 `SessionContext`，通过 Context 注入给守卫与页面。
//! 身份提供方的实现 `BackendAuth` 负责令牌的持久化与校验。

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use gloo_storage::Storage;
use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use leptos::task::spawn_local;
use luna_shared::date::{Clock, SystemClock, Timestamp};
use luna_shared::error::{LunaErrorStatus, LunaResult};
use luna_shared::protocol::{
    GetUserRequest, LogoutRequest, PasswordGrantRequest, RefreshTokenRequest, StoredSession,
};
use luna_shared::session::{
    self, AuthEvent, IdentityProvider, REFRESH_RETRY, RefreshOutcome, SessionState,
};
use luna_shared::{Identity, STORAGE_SESSION_KEY};

use crate::api::BackendClient;

// =========================================================
// 身份提供方实现
// =========================================================

pub struct BackendAuth {
    client: BackendClient,
}

impl BackendAuth {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn load_stored() -> Option<StoredSession> {
        gloo_storage::LocalStorage::get::<StoredSession>(STORAGE_SESSION_KEY).ok()
    }

    fn persist(&self, stored: &StoredSession) {
        if let Err(e) = gloo_storage::LocalStorage::set(STORAGE_SESSION_KEY, stored) {
            log::warn!("[Session] Failed to persist session: {}", e);
        }
        self.client.set_access_token(Some(stored.access_token.clone()));
    }

    fn forget(&self) {
        gloo_storage::LocalStorage::delete(STORAGE_SESSION_KEY);
        self.client.set_access_token(None);
    }

    async fn exchange(&self, stored: &StoredSession) -> LunaResult<StoredSession> {
        let req = RefreshTokenRequest {
            refresh_token: stored.refresh_token.clone(),
        };
        let session = self.client.send(&req).await?;
        let refreshed = StoredSession::from_auth(session, SystemClock.now());
        self.persist(&refreshed);
        Ok(refreshed)
    }
}

#[async_trait(?Send)]
impl IdentityProvider for BackendAuth {
    async fn restore(&self) -> LunaResult<Option<Identity>> {
        let Some(mut stored) = Self::load_stored() else {
            return Ok(None);
        };

        if stored.needs_refresh(SystemClock.now()) {
            match self.exchange(&stored).await {
                Ok(refreshed) => stored = refreshed,
                Err(e) if !session::is_refresh_rejection(e.status) => return Err(e),
                Err(e) => {
                    log::info!("[Session] Stored session rejected: {}", e);
                    self.forget();
                    return Ok(None);
                }
            }
        }

        self.client.set_access_token(Some(stored.access_token.clone()));
        match self.client.send(&GetUserRequest).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.status == LunaErrorStatus::Unauthorized => {
                log::info!("[Session] Access token no longer valid");
                self.forget();
                Ok(None)
            }
            // 离线时信任本地保存的用户
            Err(e) => {
                log::warn!("[Session] Could not validate session: {}", e);
                Ok(Some(stored.user))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> LunaResult<Identity> {
        let req = PasswordGrantRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session = self
            .client
            .send(&req)
            .await
            .map_err(|e| e.in_op("auth.sign_in"))?;
        let stored = StoredSession::from_auth(session, SystemClock.now());
        self.persist(&stored);
        Ok(stored.user)
    }

    async fn sign_out(&self) -> LunaResult<()> {
        let result = self.client.send(&LogoutRequest).await;
        self.forget();
        result.map_err(|e| e.in_op("auth.sign_out"))
    }

    async fn refresh(&self) -> LunaResult<Option<Identity>> {
        let Some(stored) = Self::load_stored() else {
            return Ok(None);
        };
        match self.exchange(&stored).await {
            Ok(refreshed) => Ok(Some(refreshed.user)),
            Err(e) => {
                if session::is_refresh_rejection(e.status) {
                    self.forget();
                }
                Err(e.in_op("auth.refresh"))
            }
        }
    }

    fn session_expiry(&self) -> Option<Timestamp> {
        Self::load_stored().map(|s| s.expires_at)
    }
}

// =========================================================
// 会话上下文
// =========================================================

/// 会话上下文
///
/// 包含读写信号与身份提供方，通过 Context 在组件间共享。
#[derive(Clone, Copy)]
pub struct SessionContext {
    /// 会话状态（只读）
    pub state: ReadSignal<SessionState>,
    set_state: WriteSignal<SessionState>,
    provider: StoredValue<Rc<BackendAuth>, LocalStorage>,
    /// 下一次令牌刷新，drop 即取消
    refresh_timer: StoredValue<Option<Timeout>, LocalStorage>,
}

impl SessionContext {
    pub fn new(provider: BackendAuth) -> Self {
        let (state, set_state) = signal(SessionState::bootstrapping());
        Self {
            state,
            set_state,
            provider: StoredValue::new_local(Rc::new(provider)),
            refresh_timer: StoredValue::new_local(None),
        }
    }

    /// 当前身份（仅在身份变化时通知）
    pub fn identity(&self) -> Memo<Option<Identity>> {
        let state = self.state;
        Memo::new(move |_| state.with(|s| s.identity.clone()))
    }

    fn apply(&self, event: AuthEvent) {
        self.set_state.update(|state| {
            if state.apply(event) {
                log::info!(
                    "[Session] Identity changed: {:?}",
                    state.identity.as_ref().map(|i| i.id.as_str())
                );
            }
        });
    }
}

/// 从 Context 获取会话上下文
pub fn use_session() -> SessionContext {
    use_context::<SessionContext>().expect("SessionContext should be provided")
}

/// 初始化会话：从持久化存储恢复，只执行一次
pub fn init_session(ctx: &SessionContext) {
    let ctx = *ctx;
    let provider = ctx.provider.get_value();
    spawn_local(async move {
        let event = session::bootstrap(provider.as_ref()).await;
        let signed_in = matches!(event, AuthEvent::InitialSession(Some(_)));
        ctx.apply(event);
        if signed_in {
            schedule_refresh(ctx, Duration::ZERO);
        }
    });
}

/// 在访问令牌过期前安排刷新；没有会话时取消
fn schedule_refresh(ctx: SessionContext, at_least: Duration) {
    let provider = ctx.provider.get_value();
    let Some(expires_at) = provider.session_expiry() else {
        ctx.refresh_timer.set_value(None);
        return;
    };

    let delay = session::next_refresh_delay(expires_at, SystemClock.now()).max(at_least);
    log::debug!("[Session] Next token refresh in {}s", delay.as_secs());
    // setTimeout 的上限是 i32::MAX 毫秒
    let millis = delay.as_millis().min(i32::MAX as u128) as u32;
    let timer = Timeout::new(millis, move || spawn_local(run_refresh(ctx)));
    ctx.refresh_timer.set_value(Some(timer));
}

async fn run_refresh(ctx: SessionContext) {
    let provider = ctx.provider.get_value();
    let outcome = session::refresh(provider.as_ref()).await;
    if let Some(event) = outcome.event() {
        ctx.apply(event);
    }
    match outcome {
        RefreshOutcome::Refreshed(_) => schedule_refresh(ctx, Duration::ZERO),
        RefreshOutcome::Retry => schedule_refresh(ctx, REFRESH_RETRY),
        RefreshOutcome::Rejected | RefreshOutcome::NoSession => {
            ctx.refresh_timer.set_value(None)
        }
    }
}

/// 登录
///
/// # Returns
/// 失败时返回可展示的错误消息
pub async fn login(ctx: SessionContext, email: String, password: String) -> Result<(), String> {
    let provider = ctx.provider.get_value();
    match provider.sign_in(&email, &password).await {
        Ok(identity) => {
            ctx.apply(AuthEvent::SignedIn(identity));
            schedule_refresh(ctx, Duration::ZERO);
            Ok(())
        }
        Err(e) => {
            log::warn!("[Session] Sign-in failed: {}", e);
            Err(e.message().to_string())
        }
    }
}

/// 注销并清除状态
///
/// 导航由守卫在身份变为空后自动处理。
pub async fn logout(ctx: SessionContext) {
    ctx.refresh_timer.set_value(None);
    let provider = ctx.provider.get_value();
    let event = session::sign_out(provider.as_ref()).await;
    ctx.apply(event);
}
