use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use async_io::Timer;
use futures_core::FusedFuture;
use smallvec::{smallvec, SmallVec};

use super::{CancelToken, Reason};

/// A future which resolves once a [`CancelToken`] fires.
///
/// This `struct` is created by the [`fired`] method on [`CancelToken`]. See
/// its documentation for more.
///
/// [`fired`]: CancelToken::fired
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Fired {
    token: CancelToken,
    keys: SmallVec<[Option<usize>; 2]>,
    timer: Option<Timer>,
    done: bool,
}

impl Fired {
    pub(super) fn new(token: CancelToken) -> Self {
        let keys = smallvec![None; token.chain.len()];
        Self {
            token,
            keys,
            timer: None,
            done: false,
        }
    }

    /// The token this future is waiting on.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    fn finish(&mut self, reason: Reason) -> Poll<Reason> {
        self.deregister();
        self.timer = None;
        self.done = true;
        Poll::Ready(reason)
    }

    fn deregister(&mut self) {
        for (node, key) in self.token.chain.iter().zip(self.keys.iter_mut()) {
            if let Some(key) = key.take() {
                node.deregister(key);
            }
        }
    }
}

impl Future for Fired {
    type Output = Reason;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        assert!(!this.done, "`Fired` must not be polled after completing");

        if let Some(reason) = this.token.reason() {
            return this.finish(reason);
        }

        let mut all_registered = true;
        for (node, key) in this.token.chain.iter().zip(this.keys.iter_mut()) {
            all_registered &= node.register(key, cx.waker());
        }
        if !all_registered {
            // A node fired between the check above and registration.
            if let Some(reason) = this.token.reason() {
                return this.finish(reason);
            }
        }

        if let Some(deadline) = this.token.deadline() {
            let timer = this.timer.get_or_insert_with(|| Timer::at(deadline));
            if Pin::new(timer).poll(cx).is_ready() {
                if let Some(reason) = this.token.reason() {
                    return this.finish(reason);
                }
            }
        }

        Poll::Pending
    }
}

impl FusedFuture for Fired {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl Drop for Fired {
    fn drop(&mut self) {
        self.deregister();
    }
}
