//! 单页等待失败后的重排策略（次数上限 / 冷却时间）。

use std::time::Duration;

use crate::base_system::context::Config;

/// 某一页的等待超时或失败后是否继续排队、排队前冷却多久。
///
/// 默认不限次数、不冷却：一个永久失败的页面会一直在队列里打转，
/// 需要上限时通过 `max_waits` 显式设置。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_waits: Option<u32>,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn capped(max_waits: u32) -> Self {
        Self {
            max_waits: Some(max_waits.max(1)),
            backoff: Duration::ZERO,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn from_config(cfg: &Config) -> Self {
        let base = match cfg.max_page_waits {
            0 => Self::unlimited(),
            n => Self::capped(n),
        };
        base.with_backoff(Duration::from_millis(cfg.retry_backoff_ms))
    }

    /// `waits` 为该页已经失败的等待次数。
    pub fn exhausted(&self, waits: u32) -> bool {
        self.max_waits.is_some_and(|max| waits >= max)
    }

    pub fn cooldown(&self) {
        if !self.backoff.is_zero() {
            std::thread::sleep(self.backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_never_gives_up() {
        let p = RetryPolicy::default();
        assert!(!p.exhausted(0));
        assert!(!p.exhausted(u32::MAX));
        assert!(p.backoff.is_zero());
    }

    #[test]
    fn capped_gives_up_at_limit() {
        let p = RetryPolicy::capped(3);
        assert!(!p.exhausted(2));
        assert!(p.exhausted(3));
        assert_eq!(RetryPolicy::capped(0).max_waits, Some(1));
    }

    #[test]
    fn config_zero_means_unlimited() {
        let mut cfg = Config::default();
        cfg.max_page_waits = 0;
        cfg.retry_backoff_ms = 25;
        let p = RetryPolicy::from_config(&cfg);
        assert_eq!(p.max_waits, None);
        assert_eq!(p.backoff, Duration::from_millis(25));

        cfg.max_page_waits = 5;
        assert_eq!(RetryPolicy::from_config(&cfg).max_waits, Some(5));
    }
}
