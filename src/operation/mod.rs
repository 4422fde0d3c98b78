//! Units of work that can take part in a race.
//!
//! An [`Operation`] is anything with a [`Label`] that can be started with a
//! [`CancelToken`] and eventually yields `Ok(value)` or `Err(cause)`. The
//! token is the operation's stop request: it fires when the caller gives up,
//! when a deadline passes, or when another operation has already won.
//!
//! Two adapters cover the common cases:
//!
//! - [`from_fn`] wraps an async closure. Its future is polled by the race
//!   itself and simply stops being polled once the race is over.
//! - [`blocking`] wraps a synchronous closure and runs it on its own thread.
//!   Such work can only stop early if it checks the token; otherwise its
//!   result is discarded when it eventually arrives.
//!
//! Operations of different types can race together after being erased with
//! [`Operation::boxed`].

use core::fmt;
use core::future::Future;
use core::pin::Pin;

use crate::cancel::CancelToken;

pub use blocking::{blocking, Blocking, BlockingTask, StopHandle};
pub use from_fn::{from_fn, FromFn};
pub use label::Label;

mod blocking;
mod from_fn;
mod label;

/// An owned dynamically typed future, as produced by [`BoxOperation`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unit of work racing to produce a value.
pub trait Operation {
    /// The value produced on success.
    type Output;

    /// The error produced on failure.
    type Error;

    /// The future driving the operation to completion.
    type Future: Future<Output = Result<Self::Output, Self::Error>>;

    /// The name this operation races under.
    fn label(&self) -> Label;

    /// Start the operation.
    ///
    /// This must return without blocking. `stop` fires once the operation's
    /// result is no longer wanted; work with natural checkpoints should
    /// observe it and stop making progress.
    fn start(self, stop: CancelToken) -> Self::Future;

    /// Erase the type of this operation so it can race alongside operations
    /// of other types.
    fn boxed<'a>(self) -> BoxOperation<'a, Self::Output, Self::Error>
    where
        Self: Sized + Send + 'a,
        Self::Future: Send + 'a,
    {
        BoxOperation::new(self)
    }
}

type BoxStart<'a, T, E> = Box<dyn FnOnce(CancelToken) -> BoxFuture<'a, Result<T, E>> + Send + 'a>;

/// A type-erased [`Operation`].
///
/// This `struct` is created by the [`boxed`] method on [`Operation`].
///
/// [`boxed`]: Operation::boxed
pub struct BoxOperation<'a, T, E> {
    label: Label,
    start: BoxStart<'a, T, E>,
}

impl<'a, T, E> BoxOperation<'a, T, E> {
    /// Erase the type of `operation`.
    pub fn new<O>(operation: O) -> Self
    where
        O: Operation<Output = T, Error = E> + Send + 'a,
        O::Future: Send + 'a,
    {
        Self {
            label: operation.label(),
            start: Box::new(move |stop| -> BoxFuture<'a, Result<T, E>> {
                Box::pin(operation.start(stop))
            }),
        }
    }
}

impl<'a, T, E> Operation for BoxOperation<'a, T, E> {
    type Output = T;
    type Error = E;
    type Future = BoxFuture<'a, Result<T, E>>;

    fn label(&self) -> Label {
        self.label.clone()
    }

    fn start(self, stop: CancelToken) -> Self::Future {
        (self.start)(stop)
    }
}

impl<T, E> fmt::Debug for BoxOperation<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxOperation")
            .field("label", &self.label)
            .finish()
    }
}
