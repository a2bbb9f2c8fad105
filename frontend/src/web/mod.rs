//! 浏览器 API 适配层
//!
//! 只做 DOM / History / 事件的接入，状态与决策都在 `luna_shared` 中。

pub mod connectivity;
pub mod platform;
pub mod router;
