use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

/// Point-in-time view of a pool's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolState {
    /// Connections attributed to the pool, idle and checked out.
    pub open: u32,
    pub idle: u32,
    /// Acquirers currently blocked on capacity.
    pub waiting: u32,
    pub closed: bool,
}

impl PoolState {
    pub fn in_use(&self) -> u32 {
        self.open.saturating_sub(self.idle)
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ConnectionState {
    pub id: Uuid,
    pub created: Instant,
    pub idle_since: Option<Instant>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            created: Instant::now(),
            idle_since: None,
        }
    }
}

impl ConnectionState {
    pub fn is_idle(&self) -> bool {
        self.idle_since.is_some()
    }

    /// Idle for at least `idle_timeout`. A zero timeout never expires.
    pub fn is_beyond_idle_timeout(&self, idle_timeout: Duration, now: Instant) -> bool {
        !idle_timeout.is_zero()
            && self
                .idle_since
                .map_or(false, |idle_since| now.duration_since(idle_since) >= idle_timeout)
    }

    /// Alive for at least `max_lifetime`. A zero lifetime never expires.
    pub fn is_beyond_lifetime(&self, max_lifetime: Duration, now: Instant) -> bool {
        !max_lifetime.is_zero() && now.duration_since(self.created) >= max_lifetime
    }

    pub fn is_expired(&self, idle_timeout: Duration, max_lifetime: Duration, now: Instant) -> bool {
        self.is_beyond_idle_timeout(idle_timeout, now) || self.is_beyond_lifetime(max_lifetime, now)
    }

    pub fn set_idle(&mut self, now: Instant) {
        self.idle_since = Some(now);
    }

    pub fn set_live(&mut self) {
        self.idle_since = None;
    }
}
