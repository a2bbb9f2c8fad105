//! 客户端运行时配置
//!
//! 构建时环境变量提供默认值，后端 URL 可被 LocalStorage 覆盖（方便切换环境）。

use std::time::Duration;

use gloo_storage::Storage;
use luna_shared::STORAGE_BACKEND_URL_KEY;
use luna_shared::platform::DEFAULT_MOBILE_BREAKPOINT;
use luna_shared::role::DEFAULT_ROLE_CACHE_TTL;

const DEFAULT_BACKEND_URL: &str = "http://localhost:54321";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub backend_url: String,
    pub anon_key: String,
    pub role_cache_ttl: Duration,
    pub mobile_breakpoint: u32,
}

/// 尚未解析的原始配置值
#[derive(Debug, Default)]
struct RawConfig<'a> {
    backend_url: Option<&'a str>,
    anon_key: Option<&'a str>,
    role_cache_ttl_secs: Option<&'a str>,
    mobile_breakpoint: Option<&'a str>,
    stored_backend_url: Option<String>,
}

impl ClientConfig {
    pub fn load() -> Self {
        let raw = RawConfig {
            backend_url: option_env!("LUNA_BACKEND_URL"),
            anon_key: option_env!("LUNA_ANON_KEY"),
            role_cache_ttl_secs: option_env!("LUNA_ROLE_CACHE_TTL_SECS"),
            mobile_breakpoint: option_env!("LUNA_MOBILE_BREAKPOINT"),
            stored_backend_url: gloo_storage::LocalStorage::get::<String>(STORAGE_BACKEND_URL_KEY)
                .ok(),
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig<'_>) -> Self {
        let backend_url = raw
            .stored_backend_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| raw.backend_url.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let role_cache_ttl = raw
            .role_cache_ttl_secs
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ROLE_CACHE_TTL);

        let mobile_breakpoint = raw
            .mobile_breakpoint
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MOBILE_BREAKPOINT);

        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            anon_key: raw.anon_key.unwrap_or_default().to_string(),
            role_cache_ttl,
            mobile_breakpoint,
        }
    }
}
