use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use tokio::time::Instant;
use uuid::Uuid;

use super::{
    manager::{Connection, Manager},
    state::ConnectionState,
    PoolInner,
};

/// A connection resting in the idle registry.
#[non_exhaustive]
pub struct IdleConnection<M: Manager> {
    pub connection: M::Connection,
    pub state: ConnectionState,
}

impl<M: Manager> IdleConnection<M> {
    pub fn is_errored(&self) -> bool {
        self.connection.is_errored()
    }

    pub fn into_live(self) -> LiveConnection<M> {
        let mut state = self.state;
        state.set_live();
        LiveConnection {
            connection: self.connection,
            state,
            errored: false,
        }
    }
}

/// A checked-out connection together with its bookkeeping.
#[non_exhaustive]
pub struct LiveConnection<M: Manager> {
    pub connection: M::Connection,
    pub state: ConnectionState,
    errored: bool,
}

impl<M: Manager> LiveConnection<M> {
    pub fn new(connection: M::Connection) -> Self {
        Self {
            connection,
            state: ConnectionState::default(),
            errored: false,
        }
    }

    pub fn is_errored(&self) -> bool {
        self.errored || self.connection.is_errored()
    }

    pub fn into_idle(self, now: Instant) -> IdleConnection<M> {
        let mut state = self.state;
        state.set_idle(now);
        IdleConnection {
            connection: self.connection,
            state,
        }
    }
}

/// A connection borrowed from a [`Pool`](super::Pool).
///
/// Dropping it, or calling [`release`](Self::release), hands the connection
/// back: it is either parked in the idle registry or closed if it is
/// errored, too old, or the pool has been closed meanwhile.
pub struct PooledConnection<M: Manager> {
    live: Option<LiveConnection<M>>,
    pool: Arc<PoolInner<M>>,
}

impl<M: Manager> PooledConnection<M> {
    pub(crate) fn new(live: LiveConnection<M>, pool: Arc<PoolInner<M>>) -> Self {
        Self {
            live: Some(live),
            pool,
        }
    }

    fn live(&self) -> &LiveConnection<M> {
        // only `Drop` takes the connection out
        self.live.as_ref().unwrap_or_else(|| unreachable!("connection already released"))
    }

    fn live_mut(&mut self) -> &mut LiveConnection<M> {
        self.live.as_mut().unwrap_or_else(|| unreachable!("connection already released"))
    }

    pub fn connection(&self) -> &M::Connection {
        &self.live().connection
    }

    pub fn connection_mut(&mut self) -> &mut M::Connection {
        &mut self.live_mut().connection
    }

    pub fn id(&self) -> Uuid {
        self.live().state.id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.live().state
    }

    /// Flags the connection as unusable so it is closed instead of reused.
    pub fn mark_errored(&mut self) {
        self.live_mut().errored = true;
    }

    pub fn is_errored(&self) -> bool {
        self.live().is_errored()
    }

    pub fn release(self) {
        drop(self)
    }
}

impl<M: Manager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        self.connection()
    }
}

impl<M: Manager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection_mut()
    }
}

impl<M: Manager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            self.pool.release(live);
        }
    }
}

impl<M: Manager> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.live {
            Some(live) => f
                .debug_struct("PooledConnection")
                .field("id", &live.state.id)
                .field("errored", &live.is_errored())
                .finish(),
            None => write!(f, "PooledConnection(released)"),
        }
    }
}
