use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::sync::oneshot;
use tracing::{trace, warn};

use super::{manager::Manager, PoolInner, Shared};

/// Spawns the expiry sweeper unless one is already running, no expiry is
/// configured, or there is nothing idle to watch. Must run under the pool lock.
pub(crate) fn start_locked<M: Manager>(pool: &Arc<PoolInner<M>>, shared: &mut Shared<M>) {
    let Some(interval) = pool.config.sweep_interval() else {
        return;
    };
    if shared.closed || shared.idle.is_empty() {
        return;
    }
    // a closed sender means the task went down with its runtime
    if shared.sweeper.as_ref().is_some_and(|stop| !stop.is_closed()) {
        return;
    }

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no tokio runtime available, idle connections will only expire on acquire");
        return;
    };

    let (stop_tx, stop_rx) = oneshot::channel();
    shared.sweeper = Some(stop_tx);
    runtime.spawn(run(Arc::downgrade(pool), interval, stop_rx));
    trace!(?interval, "expiry sweeper started");
}

async fn run<M: Manager>(
    pool: Weak<PoolInner<M>>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = &mut stop => return,
        }

        let Some(pool) = pool.upgrade() else {
            return;
        };
        if !pool.sweep() {
            trace!("expiry sweeper stopped");
            return;
        }
    }
}
