use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

/// The sweeper never wakes more often than this.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Ceiling on open connections (idle + checked out). `0` means unbounded.
    pub max_open: u32,
    /// How long a connection may sit idle. `Duration::ZERO` disables the check.
    pub idle_timeout: Duration,
    /// How long a connection may live since it was dialed. `Duration::ZERO` disables the check.
    pub max_lifetime: Duration,
    pub timeouts: Timeouts,
}

impl PoolConfig {
    pub fn new(max_open: u32) -> Self {
        Self {
            max_open,
            ..Default::default()
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout.unwrap_or(Duration::ZERO);
        self
    }

    pub fn with_max_lifetime(mut self, max_lifetime: Option<Duration>) -> Self {
        self.max_lifetime = max_lifetime.unwrap_or(Duration::ZERO);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.max_open > 0
    }

    pub fn has_expiry(&self) -> bool {
        !self.idle_timeout.is_zero() || !self.max_lifetime.is_zero()
    }

    /// Period of the expiry sweeper: the smaller of the enabled limits,
    /// floored at [`MIN_SWEEP_INTERVAL`]. `None` when no limit is enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        let interval = [self.idle_timeout, self.max_lifetime]
            .into_iter()
            .filter(|d| !d.is_zero())
            .min()?;

        Some(interval.max(MIN_SWEEP_INTERVAL))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open: 10,
            idle_timeout: Duration::ZERO,
            max_lifetime: Duration::ZERO,
            timeouts: Timeouts::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Bound on the whole acquire, waiting included.
    pub acquire: Option<Duration>,
    /// Bound on a single dial.
    pub connect: Option<Duration>,
}

impl Timeouts {
    pub fn with_acquire(mut self, acquire: Option<Duration>) -> Self {
        self.acquire = acquire;
        self
    }

    pub fn with_connect(mut self, connect: Option<Duration>) -> Self {
        self.connect = connect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_interval_disabled_without_limits() {
        let config = PoolConfig::new(4);
        assert!(!config.has_expiry());
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn sweep_interval_takes_smaller_enabled_limit() {
        let config = PoolConfig::new(4)
            .with_idle_timeout(Some(Duration::from_secs(30)))
            .with_max_lifetime(Some(Duration::from_secs(5)));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(5)));

        let config = PoolConfig::new(4).with_idle_timeout(Some(Duration::from_secs(30)));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn sweep_interval_is_floored() {
        let config = PoolConfig::new(1).with_max_lifetime(Some(Duration::from_millis(30)));
        assert_eq!(config.sweep_interval(), Some(MIN_SWEEP_INTERVAL));
    }

    #[test]
    fn zero_max_open_is_unbounded() {
        assert!(!PoolConfig::new(0).is_bounded());
        assert!(PoolConfig::default().is_bounded());
    }

    #[test]
    fn config_from_partial_json() {
        let config: PoolConfig = serde_json::from_str(
            r#"{"max_open": 3, "max_lifetime": {"secs": 60, "nanos": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.max_open, 3);
        assert_eq!(config.max_lifetime, Duration::from_secs(60));
        assert_eq!(config.idle_timeout, Duration::ZERO);
        assert_eq!(config.timeouts, Timeouts::default());
    }

    #[test]
    fn config_json_round_trip() {
        let config = PoolConfig::new(2).with_timeouts(
            Timeouts::default()
                .with_acquire(Some(Duration::from_secs(3)))
                .with_connect(Some(Duration::from_millis(500))),
        );
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
