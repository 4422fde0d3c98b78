use core::fmt;
use core::future::Future;

use super::{Label, Operation};
use crate::cancel::CancelToken;

/// Create an [`Operation`] from an async closure.
///
/// The closure receives the operation's stop token. Its future is polled by
/// the race that runs it, so it is cancelled outright (dropped) once the race
/// resolves; the token additionally lets it notice an abandoned race while it
/// is still running, for instance in between steps of a slow loop.
///
/// # Examples
///
/// ```
/// use futures_race::operation::{from_fn, Operation};
/// use futures_race::cancel::CancelToken;
/// # futures_lite::future::block_on(async {
///
/// let op = from_fn("greeting", |stop: CancelToken| async move {
///     stop.check()?;
///     Ok::<_, std::io::Error>("hello")
/// });
/// assert_eq!(op.label(), "greeting");
/// assert_eq!(op.start(CancelToken::never()).await.unwrap(), "hello");
/// # });
/// ```
pub fn from_fn<F, Fut, T, E>(label: impl Into<Label>, f: F) -> FromFn<F>
where
    F: FnOnce(CancelToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    FromFn {
        label: label.into(),
        f,
    }
}

/// An operation backed by an async closure.
///
/// This `struct` is created by [`from_fn`]. See its documentation for more.
pub struct FromFn<F> {
    label: Label,
    f: F,
}

impl<F, Fut, T, E> Operation for FromFn<F>
where
    F: FnOnce(CancelToken) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    type Output = T;
    type Error = E;
    type Future = Fut;

    fn label(&self) -> Label {
        self.label.clone()
    }

    fn start(self, stop: CancelToken) -> Self::Future {
        (self.f)(stop)
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").field("label", &self.label).finish()
    }
}
