use std::future::Future;

/// The opaque client connection handed out by the pool.
///
/// The pool never looks inside it: it only closes it and asks whether the
/// consumer has flagged it as unusable.
pub trait Connection: Send + 'static {
    /// Releases the underlying resources. Called at most once, never while
    /// the pool lock is held.
    fn close(&mut self);

    /// Set by the consumer once the connection is known to be broken.
    fn is_errored(&self) -> bool {
        false
    }
}

/// Dials new connections for a pool.
pub trait Manager: 'static + Send + Sync {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync + 'static;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A [`Manager`] backed by a plain dial closure.
#[derive(Clone)]
pub struct DialFn<F>(F);

impl<F> std::fmt::Debug for DialFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "DialFn")
    }
}

pub fn dial_fn<F, Fut, C, E>(dial: F) -> DialFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send,
    C: Connection,
    E: std::error::Error + Send + Sync + 'static,
{
    DialFn(dial)
}

impl<F, Fut, C, E> Manager for DialFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send,
    C: Connection,
    E: std::error::Error + Send + Sync + 'static,
{
    type Connection = C;
    type Error = E;

    fn connect(&self) -> impl Future<Output = Result<C, E>> + Send {
        (self.0)()
    }
}
