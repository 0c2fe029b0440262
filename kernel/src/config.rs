// Scheduler tunables. Defaults match the reference board build:
// 3 s watchdog, watchdog on for every task, 8 events, 4 groups.

use crate::signal::MAX_FLAGS;

pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u32 = 3000;
pub const DEFAULT_EVENTS: u8 = 8;
pub const DEFAULT_GROUPS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub watchdog_timeout_ms: u32,
    /// Newly registered tasks start with the watchdog enabled
    pub watchdog_by_default: bool,
    /// Event flags, at most 32
    pub events: u8,
    /// Suspension groups, at most 32
    pub groups: u8,
}

impl SchedulerConfig {
    pub const fn new() -> Self {
        Self {
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            watchdog_by_default: true,
            events: DEFAULT_EVENTS,
            groups: DEFAULT_GROUPS,
        }
    }

    pub const fn with_watchdog_timeout(mut self, ms: u32) -> Self {
        self.watchdog_timeout_ms = ms;
        self
    }

    pub const fn with_watchdog_by_default(mut self, on: bool) -> Self {
        self.watchdog_by_default = on;
        self
    }

    pub const fn with_events(mut self, n: u8) -> Self {
        self.events = if n > MAX_FLAGS { MAX_FLAGS } else { n };
        self
    }

    pub const fn with_groups(mut self, n: u8) -> Self {
        self.groups = if n > MAX_FLAGS { MAX_FLAGS } else { n };
        self
    }

    /// Timeout handed to a new task, `None` when the watchdog is off by default.
    pub const fn default_watchdog(&self) -> Option<u32> {
        if self.watchdog_by_default {
            Some(self.watchdog_timeout_ms)
        } else {
            None
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_clamp_flag_counts() {
        let cfg = SchedulerConfig::new().with_events(64).with_groups(2);
        assert_eq!(cfg.events, 32);
        assert_eq!(cfg.groups, 2);
    }

    #[test]
    fn watchdog_default_follows_flag() {
        let cfg = SchedulerConfig::new().with_watchdog_timeout(1000);
        assert_eq!(cfg.default_watchdog(), Some(1000));
        assert_eq!(cfg.with_watchdog_by_default(false).default_watchdog(), None);
    }
}
