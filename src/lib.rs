//! A bounded, async pool of reusable stateful client connections.
//!
//! Callers share a capped number of expensive connections: idle ones are
//! reused, new ones are dialed only up to the configured ceiling, and a
//! background sweeper retires connections past their idle or lifetime limit.
//!
//! ```no_run
//! use std::time::Duration;
//! use conn_pool::{dial_fn, Connection, Pool};
//!
//! struct Client;
//!
//! impl Connection for Client {
//!     fn close(&mut self) {}
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Pool::builder()
//!     .max_open(4)
//!     .idle_timeout(Some(Duration::from_secs(30)))
//!     .max_lifetime(Some(Duration::from_secs(300)))
//!     .build(dial_fn(|| async { Ok::<_, std::io::Error>(Client) }));
//!
//! let conn = pool.get().await?;
//! // talk to the server through `conn`...
//! conn.release();
//!
//! pool.close();
//! # Ok(())
//! # }
//! ```

pub mod pool;

pub use pool::config::{PoolConfig, Timeouts};
pub use pool::connection::PooledConnection;
pub use pool::error::PoolError;
pub use pool::manager::{dial_fn, Connection, DialFn, Manager};
pub use pool::state::{ConnectionState, PoolState};
pub use pool::{Pool, PoolBuilder};

pub type PoolResult<T, E> = Result<T, PoolError<E>>;
