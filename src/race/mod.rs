//! Race operations against each other, a deadline, and a cancellation token.
//!
//! A race starts every operation, waits for the first one to finish, and
//! reports exactly one [`RaceResult`]. As soon as the race is decided, every
//! other operation is told to stop through its token and its future is
//! dropped. A cancellation or deadline observed in the same poll as a
//! completion takes precedence over it.

use core::future::Future;
use core::time::Duration;

use crate::cancel::CancelToken;
use crate::operation::Operation;

pub use result::{EmptyRace, RaceError, RaceResult};
pub use vec::RaceUntil;

pub(crate) use session::RaceSession;

mod array;
mod result;
mod session;
mod vec;

/// The deadline applied by [`Coordinator::with_default_deadline`].
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// What a race does when an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failure decides the race, like a first success would.
    #[default]
    FailFast,
    /// Failures are set aside while other operations are still running.
    ///
    /// If every operation fails, the race reports the failure which happened
    /// first.
    KeepRacing,
}

/// Configures and starts races.
///
/// A default coordinator applies no deadline of its own and lets the first
/// failure decide the race.
///
/// # Examples
///
/// ```
/// use futures_race::cancel::CancelToken;
/// use futures_race::operation::{from_fn, Operation};
/// use futures_race::race::{Coordinator, FailurePolicy};
/// use std::time::Duration;
///
/// # futures_lite::future::block_on(async {
/// let coordinator = Coordinator::new()
///     .deadline(Duration::from_secs(1))
///     .policy(FailurePolicy::KeepRacing);
///
/// let ops = vec![
///     from_fn("refused", |_stop| async { Err::<u8, &str>("refused") }).boxed(),
///     from_fn("primary", |_stop| async { Ok::<u8, &str>(1) }).boxed(),
/// ];
/// let res = coordinator.race(ops, &CancelToken::never()).unwrap().await;
/// assert_eq!(res.winner().map(|(label, _)| label), Some("primary".into()));
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coordinator {
    deadline: Option<Duration>,
    policy: FailurePolicy,
}

impl Coordinator {
    /// A coordinator with no deadline and [`FailurePolicy::FailFast`].
    pub const fn new() -> Self {
        Self {
            deadline: None,
            policy: FailurePolicy::FailFast,
        }
    }

    /// A coordinator which gives up after [`DEFAULT_DEADLINE`].
    pub const fn with_default_deadline() -> Self {
        Self::new().deadline(DEFAULT_DEADLINE)
    }

    /// Give up on every race after `deadline`, measured from the moment the
    /// race is started.
    ///
    /// The caller's token still applies: whichever fires first ends the race.
    #[must_use]
    pub const fn deadline(self, deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    /// Choose what happens when an operation fails.
    #[must_use]
    pub const fn policy(self, policy: FailurePolicy) -> Self {
        Self { policy, ..self }
    }

    /// The deadline applied to each race, if any.
    pub fn race_deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// The policy applied to failing operations.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Start racing `operations` until one finishes or `token` fires.
    ///
    /// Every operation is started before this returns, unless `token` has
    /// already fired, in which case none are. Dropping the returned future
    /// stops every operation.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyRace`] if `operations` is empty. Nothing is started.
    pub fn race<I>(
        &self,
        operations: I,
        token: &CancelToken,
    ) -> Result<RaceUntil<I::Item>, EmptyRace>
    where
        I: IntoIterator,
        I::Item: Operation,
    {
        let operations: Vec<_> = operations.into_iter().collect();
        if operations.is_empty() {
            return Err(EmptyRace);
        }
        Ok(RaceUntil::new(operations, token, self))
    }
}

/// Race a set of operations until one finishes or a token fires.
pub trait Race {
    /// The value produced by the winning operation.
    type Output;

    /// The error produced by a failing operation.
    type Error;

    /// The [`Future`] implementation returned by this method.
    type Future: Future<Output = RaceResult<Self::Output, Self::Error>>;

    /// Start every operation and wait for the first one to finish, or for
    /// `token` to fire.
    ///
    /// The race resolves to:
    ///
    /// - [`RaceResult::Winner`] when an operation succeeds first.
    /// - [`RaceResult::Error`] when an operation fails first.
    /// - [`RaceResult::Timeout`] when a deadline on `token` passes first.
    /// - [`RaceResult::Cancelled`] when `token` is cancelled first.
    ///
    /// Once resolved, every other operation is told to stop and dropped. Use
    /// [`Coordinator`] to add a deadline or to keep racing past failures.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyRace`] if there are no operations to race.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # futures_lite::future::block_on(async {
    /// use futures_race::prelude::*;
    /// use futures_race::{from_fn, CancelToken, RaceResult};
    /// use std::time::Duration;
    ///
    /// let ops = [
    ///     from_fn("slow", |_stop| async {
    ///         async_io::Timer::after(Duration::from_secs(5)).await;
    ///         Ok::<_, std::io::Error>("slow")
    ///     })
    ///     .boxed(),
    ///     from_fn("fast", |_stop| async { Ok::<_, std::io::Error>("fast") }).boxed(),
    /// ];
    ///
    /// let token = CancelToken::after(Duration::from_secs(1));
    /// match ops.race_until(&token).unwrap().await {
    ///     RaceResult::Winner { label, value } => {
    ///         assert_eq!((label.as_str(), value), ("fast", "fast"))
    ///     }
    ///     other => panic!("no winner: {other:?}"),
    /// }
    /// # });
    /// ```
    fn race_until(self, token: &CancelToken) -> Result<Self::Future, EmptyRace>;
}
