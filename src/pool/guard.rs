use std::sync::Arc;

use super::{manager::Manager, PoolInner};

/// A capacity slot reserved for a dial that has not completed yet.
///
/// Dropped without being converted (dial error, connect timeout or the
/// acquiring future cancelled), it gives the slot back and wakes a waiter.
pub struct SlotGuard<M: Manager> {
    pub pool: Arc<PoolInner<M>>,
    cancelled: bool,
}

impl<M: Manager> SlotGuard<M> {
    /// Wraps a slot already counted in `open` under the pool lock.
    pub(crate) fn new(pool: Arc<PoolInner<M>>) -> Self {
        Self {
            pool,
            cancelled: false,
        }
    }

    /// The slot now belongs to a live connection.
    pub fn cancel(mut self) -> Arc<PoolInner<M>> {
        self.cancelled = true;
        self.pool.clone()
    }
}

impl<M: Manager> Drop for SlotGuard<M> {
    fn drop(&mut self) {
        if !self.cancelled {
            self.pool.shared.lock().open -= 1;
            self.pool.available.notify_one();
        }
    }
}

/// Counts an acquirer blocked on capacity for as long as it waits.
pub(crate) struct WaitGuard<'a, M: Manager> {
    pool: &'a PoolInner<M>,
}

impl<'a, M: Manager> WaitGuard<'a, M> {
    /// The caller has already incremented `waiting` under the pool lock.
    pub(crate) fn new(pool: &'a PoolInner<M>) -> Self {
        Self { pool }
    }
}

impl<M: Manager> Drop for WaitGuard<'_, M> {
    fn drop(&mut self) {
        self.pool.shared.lock().waiting -= 1;
    }
}
