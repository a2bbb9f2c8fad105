//! 时间类型模块
//!
//! - `Timestamp`: 可序列化的毫秒时间戳，用于缓存新鲜度判断
//! - `Clock`: 时间来源抽象，测试中可替换为手动时钟

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use std::time::Duration;

// =========================================================
// Timestamp - 毫秒时间戳
// =========================================================

/// 毫秒时间戳
///
/// 内部存储为 `i64`，表示自 Unix 纪元以来的毫秒数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    #[inline]
    pub const fn new(ms: i64) -> Self {
        Self(ms)
    }

    /// 距 `earlier` 经过的时间，时钟回拨时为零
    #[inline]
    pub fn since(&self, earlier: Timestamp) -> Duration {
        *self - earlier
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.as_millis() as i64)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        let diff_ms = (self.0 - rhs.0).max(0);
        Duration::from_millis(diff_ms as u64)
    }
}

// =========================================================
// Clock - 时间来源
// =========================================================

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// 系统时钟（WASM 下通过 chrono 的 wasmbind 读取 `Date.now()`）
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(chrono::Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// 手动推进的测试时钟
    #[derive(Clone, Default)]
    pub struct ManualClock {
        now: Rc<Cell<i64>>,
    }

    impl ManualClock {
        pub fn new(start_ms: i64) -> Self {
            Self {
                now: Rc::new(Cell::new(start_ms)),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by.as_millis() as i64);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp(self.now.get())
        }
    }

    #[test]
    fn test_sub_saturates_at_zero() {
        let a = Timestamp::new(1_000);
        let b = Timestamp::new(5_000);
        assert_eq!(a - b, Duration::ZERO);
        assert_eq!(b - a, Duration::from_secs(4));
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(10);
        clock.advance(Duration::from_millis(90));
        assert_eq!(clock.now(), Timestamp::new(100));
        assert_eq!(Timestamp::new(10) + Duration::from_millis(90), clock.now());
    }
}
