//! 在线/离线状态机
//!
//! 由浏览器的 `online` / `offline` 事件驱动，不轮询。仅用于展示。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// 需要界面提示的变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityNotice {
    /// 常驻横幅
    WentOffline,
    /// 一次性提示
    BackOnline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub online: bool,
    /// 离线过且尚未提示恢复
    pub was_offline: bool,
}

impl ConnectivityState {
    pub fn new(online: bool) -> Self {
        Self {
            online,
            was_offline: !online,
        }
    }

    pub fn apply(&mut self, event: ConnectivityEvent) -> Option<ConnectivityNotice> {
        match event {
            ConnectivityEvent::Offline => {
                let changed = self.online;
                self.online = false;
                self.was_offline = true;
                changed.then_some(ConnectivityNotice::WentOffline)
            }
            ConnectivityEvent::Online => {
                self.online = true;
                if self.was_offline {
                    self.was_offline = false;
                    Some(ConnectivityNotice::BackOnline)
                } else {
                    None
                }
            }
        }
    }

    pub fn show_offline_banner(&self) -> bool {
        !self.online
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_shows_banner() {
        let mut state = ConnectivityState::default();
        assert_eq!(
            state.apply(ConnectivityEvent::Offline),
            Some(ConnectivityNotice::WentOffline)
        );
        assert!(state.show_offline_banner());
        assert!(state.was_offline);
    }

    #[test]
    fn test_back_online_notice_once() {
        let mut state = ConnectivityState::default();
        state.apply(ConnectivityEvent::Offline);

        assert_eq!(
            state.apply(ConnectivityEvent::Online),
            Some(ConnectivityNotice::BackOnline)
        );
        assert!(!state.show_offline_banner());
        assert!(!state.was_offline);
        assert_eq!(state.apply(ConnectivityEvent::Online), None);
    }

    #[test]
    fn test_online_without_outage_is_silent() {
        let mut state = ConnectivityState::default();
        assert_eq!(state.apply(ConnectivityEvent::Online), None);
    }

    #[test]
    fn test_repeated_offline_events() {
        let mut state = ConnectivityState::default();
        state.apply(ConnectivityEvent::Offline);
        assert_eq!(state.apply(ConnectivityEvent::Offline), None);
        assert!(state.show_offline_banner());
    }

    #[test]
    fn test_starting_offline_announces_recovery() {
        let mut state = ConnectivityState::new(false);
        assert!(state.show_offline_banner());
        assert_eq!(
            state.apply(ConnectivityEvent::Online),
            Some(ConnectivityNotice::BackOnline)
        );
    }
}
