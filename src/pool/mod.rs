//! A bounded pool of reusable client connections.
//!
//! Connections are dialed on demand up to [`PoolConfig::max_open`], parked in
//! an idle registry when released, and retired once they have been idle for
//! longer than [`PoolConfig::idle_timeout`] or alive for longer than
//! [`PoolConfig::max_lifetime`]. Idle connections are reused most recently
//! released first.

pub mod config;
pub mod connection;
pub mod error;
pub mod guard;
pub mod manager;
pub mod state;
mod sweeper;

use std::{marker::PhantomData, sync::Arc, time::Duration};

use config::{PoolConfig, Timeouts};
use connection::{IdleConnection, LiveConnection, PooledConnection};
use error::PoolError;
use guard::{SlotGuard, WaitGuard};
use manager::{Connection, Manager};
use parking_lot::Mutex;
use state::PoolState;
use tokio::{
    sync::{oneshot, Notify},
    time::Instant,
};
use tracing::{debug, trace};

pub struct Pool<M: Manager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: Manager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Manager> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish()
    }
}

impl<M: Manager> Pool<M> {
    /// Creates an empty pool. Nothing is dialed until the first acquire.
    pub fn new(manager: M, pool_config: PoolConfig) -> Self {
        Self {
            inner: PoolInner::new_arc(manager, pool_config),
        }
    }

    pub fn builder() -> PoolBuilder<M> {
        PoolBuilder::new()
    }

    /// Acquires a connection, reusing an idle one, dialing a new one while
    /// under capacity, or waiting for one to be released.
    ///
    /// Bounded by [`Timeouts::acquire`] when set. Dropping the returned
    /// future at any point gives back whatever capacity it had reserved.
    pub async fn get(&self) -> Result<PooledConnection<M>, PoolError<M::Error>> {
        self.inner.acquire().await
    }

    /// Same as [`get`](Self::get) but fails with [`PoolError::Exhausted`]
    /// instead of waiting for capacity.
    pub async fn try_get(&self) -> Result<PooledConnection<M>, PoolError<M::Error>> {
        self.inner.try_acquire().await
    }

    /// Closes every idle connection and stops the sweeper. Checked-out
    /// connections are closed as they are released. Later acquires fail
    /// with [`PoolError::Closed`], and so do acquires currently waiting.
    pub fn close(&self) {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.lock().closed
    }

    pub fn state(&self) -> PoolState {
        self.inner.state()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

pub struct PoolBuilder<M: Manager> {
    pool_config: PoolConfig,
    _manager: PhantomData<M>,
}

impl<M: Manager> Default for PoolBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Manager> PoolBuilder<M> {
    pub fn new() -> Self {
        Self {
            pool_config: PoolConfig::default(),
            _manager: PhantomData,
        }
    }

    pub fn pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    pub fn max_open(mut self, max_open: u32) -> Self {
        self.pool_config.max_open = max_open;
        self
    }

    pub fn idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.pool_config = self.pool_config.with_idle_timeout(idle_timeout);
        self
    }

    pub fn max_lifetime(mut self, max_lifetime: Option<Duration>) -> Self {
        self.pool_config = self.pool_config.with_max_lifetime(max_lifetime);
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.pool_config = self.pool_config.with_timeouts(timeouts);
        self
    }

    pub fn build(self, manager: M) -> Pool<M> {
        Pool::new(manager, self.pool_config)
    }
}

/// Everything guarded by the pool lock.
pub(crate) struct Shared<M: Manager> {
    /// Idle plus checked out, plus dials in flight.
    pub(crate) open: u32,
    /// Most recently released last.
    pub(crate) idle: Vec<IdleConnection<M>>,
    pub(crate) waiting: u32,
    pub(crate) closed: bool,
    /// Stop signal of the running sweeper, if any.
    pub(crate) sweeper: Option<oneshot::Sender<()>>,
}

pub struct PoolInner<M: Manager> {
    manager: M,
    config: PoolConfig,
    pub(crate) shared: Mutex<Shared<M>>,
    /// Signalled whenever a slot frees up or a connection turns idle.
    pub(crate) available: Notify,
}

enum Checkout<M: Manager> {
    Idle(IdleConnection<M>),
    Dial,
    Full,
    Closed,
}

impl<M: Manager> PoolInner<M> {
    pub fn new_arc(manager: M, pool_config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            manager,
            config: pool_config,
            shared: Mutex::new(Shared {
                open: 0,
                idle: Vec::new(),
                waiting: 0,
                closed: false,
                sweeper: None,
            }),
            available: Notify::new(),
        })
    }

    pub fn state(&self) -> PoolState {
        let shared = self.shared.lock();
        PoolState {
            open: shared.open,
            idle: shared.idle.len() as u32,
            waiting: shared.waiting,
            closed: shared.closed,
        }
    }

    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection<M>, PoolError<M::Error>> {
        match self.config.timeouts.acquire {
            Some(duration) => tokio::time::timeout(duration, self.acquire_inner(true)).await?,
            None => self.acquire_inner(true).await,
        }
    }

    pub async fn try_acquire(
        self: &Arc<Self>,
    ) -> Result<PooledConnection<M>, PoolError<M::Error>> {
        self.acquire_inner(false).await
    }

    async fn acquire_inner(
        self: &Arc<Self>,
        wait: bool,
    ) -> Result<PooledConnection<M>, PoolError<M::Error>> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);

            let mut expired = Vec::new();
            let checkout = {
                let mut shared = self.shared.lock();
                let checkout = self.checkout_locked(&mut shared, &mut expired);
                if let Checkout::Full = checkout {
                    if wait {
                        // registered before the lock is released, so a
                        // release in between cannot be missed
                        notified.as_mut().enable();
                        shared.waiting += 1;
                    }
                }
                checkout
            };
            let _waiting =
                (wait && matches!(checkout, Checkout::Full)).then(|| WaitGuard::new(self));
            self.discard(expired, "expired while idle");

            match checkout {
                Checkout::Idle(idle) => {
                    trace!(id = %idle.state.id, "reusing idle connection");
                    return Ok(PooledConnection::new(idle.into_live(), self.clone()));
                }
                Checkout::Dial => return self.connect(SlotGuard::new(self.clone())).await,
                Checkout::Closed => return Err(PoolError::Closed),
                Checkout::Full if !wait => return Err(PoolError::Exhausted),
                Checkout::Full => notified.await,
            }
        }
    }

    /// Picks the next step of an acquire. Expired or errored idle entries
    /// met on the way are moved into `expired` and no longer counted as open.
    fn checkout_locked(
        &self,
        shared: &mut Shared<M>,
        expired: &mut Vec<IdleConnection<M>>,
    ) -> Checkout<M> {
        if shared.closed {
            return Checkout::Closed;
        }

        let now = Instant::now();
        while let Some(idle) = shared.idle.pop() {
            if idle.is_errored()
                || idle
                    .state
                    .is_expired(self.config.idle_timeout, self.config.max_lifetime, now)
            {
                shared.open -= 1;
                expired.push(idle);
                continue;
            }
            return Checkout::Idle(idle);
        }

        if !self.config.is_bounded() || shared.open < self.config.max_open {
            shared.open += 1;
            Checkout::Dial
        } else {
            Checkout::Full
        }
    }

    async fn connect(
        self: &Arc<Self>,
        slot: SlotGuard<M>,
    ) -> Result<PooledConnection<M>, PoolError<M::Error>> {
        let connection = match self.config.timeouts.connect {
            Some(duration) => tokio::time::timeout(duration, self.manager.connect()).await?,
            None => self.manager.connect().await,
        };

        match connection {
            Ok(connection) => {
                let live = LiveConnection::new(connection);
                debug!(id = %live.state.id, "dialed new connection");
                Ok(PooledConnection::new(live, slot.cancel()))
            }
            Err(e) => {
                debug!(error = %e, "failed to dial connection");
                drop(slot);
                Err(PoolError::Dial(e))
            }
        }
    }

    /// Takes back a checked-out connection, either parking it in the idle
    /// registry or closing it.
    pub(crate) fn release(self: &Arc<Self>, live: LiveConnection<M>) {
        let now = Instant::now();
        let discarded = {
            let mut shared = self.shared.lock();
            let reason = if shared.closed {
                Some("pool closed")
            } else if live.is_errored() {
                Some("connection errored")
            } else if live.state.is_beyond_lifetime(self.config.max_lifetime, now) {
                Some("lifetime expired")
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    shared.open -= 1;
                    Some((live, reason))
                }
                None => {
                    trace!(id = %live.state.id, "connection returned to idle");
                    shared.idle.push(live.into_idle(now));
                    sweeper::start_locked(self, &mut shared);
                    None
                }
            }
        };
        self.available.notify_one();

        if let Some((mut live, reason)) = discarded {
            debug!(id = %live.state.id, reason, "closing released connection");
            live.connection.close();
        }
    }

    /// One pass of the expiry sweeper. Returns `false` once the sweeper
    /// should stop.
    pub(crate) fn sweep(&self) -> bool {
        let now = Instant::now();
        let expired: Vec<_> = {
            let mut shared = self.shared.lock();
            if shared.closed || shared.idle.is_empty() || !self.config.has_expiry() {
                shared.sweeper = None;
                return false;
            }

            let (expired, idle): (Vec<_>, Vec<_>) =
                std::mem::take(&mut shared.idle).into_iter().partition(|idle| {
                    idle.is_errored()
                        || idle
                            .state
                            .is_expired(self.config.idle_timeout, self.config.max_lifetime, now)
                });
            shared.idle = idle;
            shared.open -= expired.len() as u32;
            expired
        };

        trace!(evicted = expired.len(), "expiry sweep");
        self.discard(expired, "evicted by sweeper");
        true
    }

    pub(crate) fn close(&self) {
        let idle = {
            let mut shared = self.shared.lock();
            if shared.closed {
                return;
            }
            shared.closed = true;
            if let Some(stop) = shared.sweeper.take() {
                let _ = stop.send(());
            }
            let idle = std::mem::take(&mut shared.idle);
            shared.open -= idle.len() as u32;
            idle
        };
        debug!(idle = idle.len(), "closing connection pool");

        // waiters observe `closed` and give up
        self.available.notify_waiters();
        for mut idle in idle {
            idle.connection.close();
        }
    }

    /// Closes connections already removed from the accounting and hands
    /// their slots to waiters. Never call with the lock held.
    fn discard(&self, connections: Vec<IdleConnection<M>>, reason: &str) {
        for mut idle in connections {
            debug!(id = %idle.state.id, reason, "closing idle connection");
            idle.connection.close();
            self.available.notify_one();
        }
    }
}

impl<M: Manager> Drop for PoolInner<M> {
    fn drop(&mut self) {
        for mut idle in self.shared.get_mut().idle.drain(..) {
            idle.connection.close();
        }
    }
}
