//! 运行平台判定
//!
//! 纯函数：由调用方在求值时读取浏览器信号，这里只做分类。

use serde::{Deserialize, Serialize};

/// 小于该宽度的视口视为移动端
pub const DEFAULT_MOBILE_BREAKPOINT: u32 = 768;

const MOBILE_UA_MARKERS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "blackberry",
    "iemobile",
    "opera mini",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    DesktopWeb,
    /// 移动浏览器或已安装到主屏幕的 Web 应用
    MobileWeb,
    /// 运行在原生壳内
    NativeApp,
}

/// 判定所需的环境信号
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformSignals {
    pub viewport_width: Option<u32>,
    pub user_agent: String,
    /// `display-mode: standalone` 命中
    pub standalone_display: bool,
    /// 原生壳运行时桥接存在且报告为原生平台
    pub native_runtime: bool,
}

impl PlatformSignals {
    pub fn is_mobile_viewport(&self, breakpoint: u32) -> bool {
        if self.viewport_width.is_some_and(|w| w < breakpoint) {
            return true;
        }
        let ua = self.user_agent.to_ascii_lowercase();
        MOBILE_UA_MARKERS.iter().any(|m| ua.contains(m))
    }
}

impl Platform {
    pub fn classify(signals: &PlatformSignals) -> Self {
        Self::classify_with_breakpoint(signals, DEFAULT_MOBILE_BREAKPOINT)
    }

    pub fn classify_with_breakpoint(signals: &PlatformSignals, breakpoint: u32) -> Self {
        if signals.native_runtime {
            Platform::NativeApp
        } else if signals.standalone_display || signals.is_mobile_viewport(breakpoint) {
            Platform::MobileWeb
        } else {
            Platform::DesktopWeb
        }
    }

    pub fn is_desktop_web(&self) -> bool {
        matches!(self, Platform::DesktopWeb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_UA: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 Safari/605.1.15";
    const IPHONE_UA: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

    fn signals(width: u32, ua: &str) -> PlatformSignals {
        PlatformSignals {
            viewport_width: Some(width),
            user_agent: ua.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_wide_desktop_browser() {
        assert_eq!(
            Platform::classify(&signals(1440, DESKTOP_UA)),
            Platform::DesktopWeb
        );
    }

    #[test]
    fn test_narrow_viewport_is_mobile() {
        assert_eq!(
            Platform::classify(&signals(390, DESKTOP_UA)),
            Platform::MobileWeb
        );
        // 断点本身不算移动端
        assert_eq!(
            Platform::classify(&signals(768, DESKTOP_UA)),
            Platform::DesktopWeb
        );
    }

    #[test]
    fn test_mobile_user_agent_on_wide_viewport() {
        assert_eq!(
            Platform::classify(&signals(1024, IPHONE_UA)),
            Platform::MobileWeb
        );
    }

    #[test]
    fn test_installed_web_app() {
        let mut s = signals(1280, DESKTOP_UA);
        s.standalone_display = true;
        assert_eq!(Platform::classify(&s), Platform::MobileWeb);
    }

    #[test]
    fn test_native_runtime_wins() {
        let mut s = signals(1440, DESKTOP_UA);
        s.native_runtime = true;
        s.standalone_display = true;
        assert_eq!(Platform::classify(&s), Platform::NativeApp);
    }

    #[test]
    fn test_classification_is_stable() {
        let s = signals(500, IPHONE_UA);
        let first = Platform::classify(&s);
        for _ in 0..5 {
            assert_eq!(Platform::classify(&s), first);
        }
    }

    #[test]
    fn test_unknown_width_falls_back_to_user_agent() {
        let s = PlatformSignals {
            viewport_width: None,
            user_agent: DESKTOP_UA.to_string(),
            ..Default::default()
        };
        assert_eq!(Platform::classify(&s), Platform::DesktopWeb);
    }
}
