use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::io;
use std::thread;

use futures_channel::oneshot;

use super::{Label, Operation};
use crate::cancel::{CancelSource, CancelToken};

/// Create an [`Operation`] which runs a blocking closure on its own thread.
///
/// The closure receives the operation's stop token. Work made of natural
/// units (a loop over items, a sequence of requests) should call
/// [`CancelToken::check`] between units so it stops soon after the race is
/// abandoned.
///
/// # Limitations
///
/// A thread can't be preempted. If the closure never checks its token (for
/// example a single blocking network call), stopping it does not interrupt the
/// work: it runs to completion and its result is silently discarded.
///
/// If the thread can't be spawned the operation fails immediately with the
/// spawn error converted into `E`.
///
/// # Examples
///
/// ```
/// use futures_race::operation::blocking;
/// use std::time::Duration;
///
/// let op = blocking("slow-count", |stop| {
///     let mut total = 0;
///     for n in 0..10 {
///         stop.check()?;
///         std::thread::sleep(Duration::from_millis(1));
///         total += n;
///     }
///     Ok::<_, std::io::Error>(total)
/// });
/// # let _ = op;
/// ```
pub fn blocking<F, T, E>(label: impl Into<Label>, work: F) -> Blocking<F>
where
    F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Blocking {
        label: label.into(),
        work,
    }
}

/// An operation backed by a blocking closure.
///
/// This `struct` is created by [`blocking`]. See its documentation for more.
pub struct Blocking<F> {
    label: Label,
    work: F,
}

impl<F, T, E> Blocking<F>
where
    F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Start the work on a new thread and return right away.
    ///
    /// `on_done` is called on that thread with the work's result, at most once,
    /// and only if neither `stop` nor the returned [`StopHandle`] fired before
    /// the work returned.
    pub fn spawn<D>(self, stop: &CancelToken, on_done: D) -> io::Result<StopHandle>
    where
        D: FnOnce(Result<T, E>) + Send + 'static,
    {
        let source = stop.child();
        let token = source.token();
        let Blocking { label, work } = self;
        thread::Builder::new()
            .name("futures-race-blocking".into())
            .spawn(move || {
                let result = work(&token);
                if let Some(reason) = token.reason() {
                    tracing::trace!(%label, %reason, "discarding result of stopped operation");
                    return;
                }
                on_done(result);
            })?;
        Ok(StopHandle { source })
    }
}

impl<F, T, E> Operation for Blocking<F>
where
    F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<io::Error> + Send + 'static,
{
    type Output = T;
    type Error = E;
    type Future = BlockingTask<T, E>;

    fn label(&self) -> Label {
        self.label.clone()
    }

    fn start(self, stop: CancelToken) -> Self::Future {
        let (sender, receiver) = oneshot::channel();
        let on_done = move |result| {
            if sender.send(result).is_err() {
                tracing::trace!("result arrived after the task was dropped");
            }
        };
        match self.spawn(&stop, on_done) {
            Ok(handle) => BlockingTask {
                receiver,
                handle: Some(handle),
            },
            Err(err) => {
                let (sender, receiver) = oneshot::channel();
                // The receiver is alive, so this can't be refused.
                let _ = sender.send(Err(E::from(err)));
                BlockingTask {
                    receiver,
                    handle: None,
                }
            }
        }
    }
}

impl<F> fmt::Debug for Blocking<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blocking").field("label", &self.label).finish()
    }
}

/// Requests that a spawned blocking operation stop.
///
/// Stopping is cooperative, see [`blocking`] for the limitations.
#[derive(Debug)]
pub struct StopHandle {
    source: CancelSource,
}

impl StopHandle {
    /// Ask the work to stop and suppress its result.
    ///
    /// Returns `true` if this call made the request.
    pub fn stop(&self) -> bool {
        self.source.cancel()
    }

    /// Returns `true` once a stop has been requested, either through this
    /// handle or through the token the operation was spawned with.
    pub fn is_stopped(&self) -> bool {
        self.source.is_cancelled()
    }

    /// The token the spawned work observes.
    pub fn token(&self) -> CancelToken {
        self.source.token()
    }
}

/// The future of a started [`Blocking`] operation.
///
/// If the work returns after the operation's token fired, its result is
/// discarded and the task resolves to the [`Stopped`] error converted into
/// `E`. Dropping it stops the work and refuses any result still to arrive.
///
/// [`Stopped`]: crate::cancel::Stopped
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct BlockingTask<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
    handle: Option<StopHandle>,
}

impl<T, E> Future for BlockingTask<T, E>
where
    E: From<io::Error>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The worker exited without delivering: it was stopped, or it
            // panicked.
            Poll::Ready(Err(oneshot::Canceled)) => {
                let err = match this.handle.as_ref().map(|handle| handle.token().check()) {
                    Some(Err(stopped)) => io::Error::from(stopped),
                    _ => io::Error::other("blocking operation exited without a result"),
                };
                Poll::Ready(Err(E::from(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> Drop for BlockingTask<T, E> {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(handle) = &self.handle {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cancel::Reason;
    use futures_lite::future::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn runs_on_another_thread() {
        let caller = thread::current().id();
        let op = blocking("thread", move |_stop| {
            Ok::<_, io::Error>(thread::current().id() != caller)
        });
        assert!(block_on(op.start(CancelToken::never())).unwrap());
    }

    #[test]
    fn spawn_delivers_once() {
        let (tx, rx) = mpsc::channel();
        let op = blocking("once", |_stop| Ok::<_, io::Error>(42));
        let _handle = op
            .spawn(&CancelToken::never(), move |res| tx.send(res.unwrap()).unwrap())
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 42);
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn stop_suppresses_on_done() {
        let (tx, rx) = mpsc::channel::<u32>();
        let op = blocking("ignores-stop", |_stop| {
            thread::sleep(Duration::from_millis(30));
            Ok::<_, io::Error>(7)
        });
        let handle = op
            .spawn(&CancelToken::never(), move |res| tx.send(res.unwrap()).unwrap())
            .unwrap();
        assert!(handle.stop());
        assert!(!handle.stop());
        assert!(handle.is_stopped());
        // The sender is dropped without being used once the thread exits.
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
    }

    #[test]
    fn stop_is_seen_at_checkpoints() {
        let steps = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();
        let op = {
            let steps = steps.clone();
            blocking("stepper", move |stop| {
                let outcome = (0..100).try_for_each(|_| {
                    stop.check()?;
                    steps.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    Ok::<_, io::Error>(())
                });
                tx.send(outcome.as_ref().map(|_| ()).map_err(|err| err.kind()))
                    .unwrap();
                outcome
            })
        };
        let handle = op.spawn(&CancelToken::never(), |_| {}).unwrap();
        thread::sleep(Duration::from_millis(25));
        handle.stop();

        let outcome = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome, Err(io::ErrorKind::Interrupted));
        assert!(steps.load(Ordering::SeqCst) < 10);
    }

    #[test]
    fn parent_token_stops_work() {
        let parent = crate::cancel::CancelSource::new();
        let op = blocking("child", |stop| {
            while stop.check().is_ok() {
                thread::sleep(Duration::from_millis(1));
            }
            Ok::<_, io::Error>(stop.reason())
        });
        let handle = op.spawn(&parent.token(), |_| {}).unwrap();
        parent.cancel();
        assert_eq!(handle.token().reason(), Some(Reason::Cancelled));
    }

    #[test]
    fn dropping_task_stops_work() {
        let token = {
            let (tx, rx) = mpsc::channel();
            let op = blocking("dropped", move |stop: &CancelToken| {
                tx.send(stop.clone()).unwrap();
                thread::sleep(Duration::from_millis(20));
                Ok::<_, io::Error>(())
            });
            let task = op.start(CancelToken::never());
            let token = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            drop(task);
            token
        };
        assert_eq!(token.reason(), Some(Reason::Cancelled));
    }

    #[tokio::test]
    async fn standalone_task_resolves_once_stopped() {
        let source = CancelSource::new();
        let op = blocking("stepper", |stop| {
            for _ in 0..100 {
                stop.check()?;
                thread::sleep(Duration::from_millis(5));
            }
            Ok::<_, io::Error>("finished")
        });
        let task = op.start(source.token());
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task resolves after its token fires");
        assert_eq!(outcome.unwrap_err().kind(), io::ErrorKind::Interrupted);
    }

    #[tokio::test]
    async fn standalone_task_reports_timeout() {
        let op = blocking("ignores-stop", |_stop| {
            thread::sleep(Duration::from_millis(50));
            Ok::<_, io::Error>(1)
        });
        let task = op.start(CancelToken::after(Duration::from_millis(10)));
        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task resolves after its deadline");
        assert_eq!(outcome.unwrap_err().kind(), io::ErrorKind::TimedOut);
    }
}
