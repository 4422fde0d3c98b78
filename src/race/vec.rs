use super::{Coordinator, EmptyRace, FailurePolicy, Race as RaceTrait, RaceResult, RaceSession};
use crate::cancel::{CancelToken, Fired};
use crate::operation::{Label, Operation};
use crate::utils::{self, Indexer, WakerVec};

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use fixedbitset::FixedBitSet;
use futures_core::FusedFuture;
use pin_project::pin_project;

/// A future which races operations against each other and a cancellation
/// signal.
///
/// This `struct` is created by [`Coordinator::race`] and by the
/// [`race_until`] method on the [`Race`] trait. See their documentation for
/// more.
///
/// [`race_until`]: crate::race::Race::race_until
/// [`Race`]: crate::race::Race
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[pin_project]
pub struct RaceUntil<O>
where
    O: Operation,
{
    labels: Vec<Label>,
    futures: Pin<Box<[O::Future]>>,
    wakers: WakerVec,
    ready: FixedBitSet,
    failed: FixedBitSet,
    first_failure: Option<(Label, O::Error)>,
    indexer: Indexer,
    signal: Fired,
    session: RaceSession,
    policy: FailurePolicy,
}

impl<O> RaceUntil<O>
where
    O: Operation,
{
    pub(super) fn new(operations: Vec<O>, token: &CancelToken, config: &Coordinator) -> Self {
        let len = operations.len();
        let session = RaceSession::new(token, config.deadline);
        let stop = session.token();
        let labels: Vec<Label> = operations.iter().map(Operation::label).collect();

        // Work that hasn't started yet is never started once the signal fired.
        let futures: Box<[O::Future]> = if stop.is_cancelled() {
            tracing::trace!(operations = len, "signal fired before the race started");
            Box::new([])
        } else {
            tracing::trace!(operations = len, "starting race");
            operations
                .into_iter()
                .map(|operation| operation.start(stop.clone()))
                .collect()
        };

        RaceUntil {
            labels,
            futures: futures.into(),
            wakers: WakerVec::new(len),
            ready: FixedBitSet::with_capacity(len),
            failed: FixedBitSet::with_capacity(len),
            first_failure: None,
            indexer: Indexer::new(len),
            signal: stop.fired(),
            session,
            policy: config.policy,
        }
    }

    /// The labels of the racing operations, in the order they were given.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

impl<O> fmt::Debug for RaceUntil<O>
where
    O: Operation,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaceUntil")
            .field("labels", &self.labels)
            .field("policy", &self.policy)
            .field("resolved", &self.session.is_resolved())
            .finish()
    }
}

impl<O> Future for RaceUntil<O>
where
    O: Operation,
{
    type Output = RaceResult<O::Output, O::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        assert!(
            !this.session.is_resolved(),
            "`RaceUntil` must not be polled after resolving"
        );

        // The signal is polled first so it wins a tie with a completion.
        if let Poll::Ready(reason) = Pin::new(&mut *this.signal).poll(cx) {
            return Poll::Ready(resolve(this.session, this.futures, reason.into()));
        }

        {
            let mut readiness = this.wakers.readiness();
            readiness.set_waker(cx.waker());
            readiness.take_ready(this.ready);
        }

        for idx in this.indexer.iter() {
            if !this.ready.contains(idx) || this.failed.contains(idx) {
                continue;
            }
            let (Some(fut), Some(waker)) = (
                utils::get_pin_mut(this.futures.as_mut(), idx),
                this.wakers.get(idx),
            ) else {
                continue;
            };
            let mut cx = Context::from_waker(waker);
            let Poll::Ready(output) = fut.poll(&mut cx) else {
                continue;
            };

            // A completion observed once the signal fired is too late to count.
            if let Some(reason) = this.signal.token().reason() {
                return Poll::Ready(resolve(this.session, this.futures, reason.into()));
            }

            let label = this.labels[idx].clone();
            match (output, *this.policy) {
                (Ok(value), _) => {
                    let result = RaceResult::Winner { label, value };
                    return Poll::Ready(resolve(this.session, this.futures, result));
                }
                (Err(cause), FailurePolicy::FailFast) => {
                    let result = RaceResult::Error { label, cause };
                    return Poll::Ready(resolve(this.session, this.futures, result));
                }
                (Err(cause), FailurePolicy::KeepRacing) => {
                    this.failed.insert(idx);
                    if this.first_failure.is_none() {
                        *this.first_failure = Some((label, cause));
                    }
                    if this.failed.count_ones(..) < this.labels.len() {
                        continue;
                    }
                    if let Some((label, cause)) = this.first_failure.take() {
                        let result = RaceResult::Error { label, cause };
                        return Poll::Ready(resolve(this.session, this.futures, result));
                    }
                }
            }
        }

        Poll::Pending
    }
}

impl<O> FusedFuture for RaceUntil<O>
where
    O: Operation,
{
    fn is_terminated(&self) -> bool {
        self.session.is_resolved()
    }
}

/// Claim the session's single result, then stop and drop the losers.
fn resolve<F, T, E>(
    session: &RaceSession,
    futures: &mut Pin<Box<[F]>>,
    result: RaceResult<T, E>,
) -> RaceResult<T, E> {
    let claimed = session.try_resolve();
    debug_assert!(claimed, "a race must resolve exactly once");
    *futures = Box::pin([]);

    match &result {
        RaceResult::Winner { label, .. } => tracing::debug!(%label, "race won"),
        RaceResult::Error { label, .. } => {
            tracing::debug!(%label, "race lost to a failed operation")
        }
        RaceResult::Timeout => tracing::debug!("race timed out"),
        RaceResult::Cancelled => tracing::debug!("race cancelled"),
    }
    result
}

impl<O> RaceTrait for Vec<O>
where
    O: Operation,
{
    type Output = O::Output;
    type Error = O::Error;
    type Future = RaceUntil<O>;

    fn race_until(self, token: &CancelToken) -> Result<Self::Future, EmptyRace> {
        Coordinator::new().race(self, token)
    }
}
