//! One-shot cancellation signals with optional deadlines.
//!
//! A [`CancelSource`] owns the right to fire a signal; any number of
//! [`CancelToken`]s observe it. A token fires when its own source is
//! cancelled, when its deadline passes, or when any ancestor it was derived
//! from fires. Firing is monotonic: once a token reports a [`Reason`] it keeps
//! reporting that same reason forever.
//!
//! # Examples
//!
//! ```
//! use futures_race::cancel::{CancelSource, Reason};
//! use std::time::Duration;
//!
//! let request = CancelSource::new();
//! let fetch = request.token().child_with_timeout(Duration::from_secs(10));
//!
//! assert!(!fetch.token().is_cancelled());
//! request.cancel();
//! assert_eq!(fetch.token().reason(), Some(Reason::Cancelled));
//! ```

use core::fmt;
use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

pub use fired::Fired;
use node::Node;

mod fired;
mod node;

type Chain = SmallVec<[Arc<Node>; 2]>;

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// Somebody called [`CancelSource::cancel`].
    Cancelled,
    /// A deadline elapsed.
    Timeout,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Cancelled => f.write_str("cancelled"),
            Reason::Timeout => f.write_str("timed out"),
        }
    }
}

/// The error returned by [`CancelToken::check`] once the token has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped {
    reason: Reason,
}

impl Stopped {
    /// Why the work was stopped.
    pub fn reason(&self) -> Reason {
        self.reason
    }
}

impl fmt::Display for Stopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation stopped: {}", self.reason)
    }
}

impl Error for Stopped {}

impl From<Stopped> for io::Error {
    fn from(stopped: Stopped) -> Self {
        let kind = match stopped.reason {
            Reason::Cancelled => io::ErrorKind::Interrupted,
            Reason::Timeout => io::ErrorKind::TimedOut,
        };
        io::Error::new(kind, stopped)
    }
}

/// The firing side of a cancellation signal.
///
/// Dropping a `CancelSource` does *not* fire it; tokens derived from a
/// dropped source can still fire through their deadline or their ancestors.
#[derive(Debug)]
pub struct CancelSource {
    node: Arc<Node>,
    token: CancelToken,
}

impl CancelSource {
    /// Create a source which only fires when [`cancel`] is called.
    ///
    /// [`cancel`]: CancelSource::cancel
    pub fn new() -> Self {
        Self::with_parts(Chain::new(), None)
    }

    /// Create a source which also fires on its own once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_parts(Chain::new(), deadline_after(timeout))
    }

    /// Create a source which also fires on its own at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::with_parts(Chain::new(), Some(deadline))
    }

    fn with_parts(mut chain: Chain, deadline: Option<Instant>) -> Self {
        let node = Arc::new(Node::new(deadline));
        chain.push(node.clone());
        Self {
            node,
            token: CancelToken { chain },
        }
    }

    /// Fire the signal.
    ///
    /// Returns `true` if this call fired it, and `false` if it had already
    /// fired, either through an earlier call or because its deadline passed.
    /// Calling this more than once is harmless.
    pub fn cancel(&self) -> bool {
        let fired = self.node.cancel(Instant::now());
        if fired {
            tracing::trace!("cancellation source fired");
        }
        fired
    }

    /// A token observing this source (and every ancestor of it).
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Returns `true` if the source's token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The observing side of a cancellation signal.
///
/// Tokens are cheap to clone and can be shared freely between threads and
/// tasks. Work which can stop early should call [`check`] at its natural
/// checkpoints, or race its progress against [`fired`].
///
/// [`check`]: CancelToken::check
/// [`fired`]: CancelToken::fired
#[derive(Clone)]
pub struct CancelToken {
    chain: Chain,
}

impl CancelToken {
    /// A token which never fires.
    pub fn never() -> Self {
        Self { chain: Chain::new() }
    }

    /// A token which fires once `timeout` has elapsed.
    pub fn after(timeout: Duration) -> Self {
        CancelSource::with_timeout(timeout).token
    }

    /// A token which fires at `deadline`.
    pub fn at(deadline: Instant) -> Self {
        CancelSource::with_deadline(deadline).token
    }

    /// Derive a new source whose token fires when either it or `self` fires.
    pub fn child(&self) -> CancelSource {
        CancelSource::with_parts(self.chain.clone(), None)
    }

    /// Derive a new source whose token fires when it is cancelled, when
    /// `timeout` elapses, or when `self` fires.
    pub fn child_with_timeout(&self, timeout: Duration) -> CancelSource {
        CancelSource::with_parts(self.chain.clone(), deadline_after(timeout))
    }

    /// Why this token fired, or `None` while it is still active.
    ///
    /// When several links of the chain have fired, the one that fired
    /// earliest decides the reason.
    pub fn reason(&self) -> Option<Reason> {
        let now = Instant::now();
        self.chain
            .iter()
            .filter_map(|node| node.firing(now))
            .min_by_key(|firing| firing.at)
            .map(|firing| firing.reason)
    }

    /// Returns `true` once the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// A cancellation checkpoint: `Ok(())` while active, `Err(Stopped)` once
    /// the token has fired.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures_race::cancel::{CancelSource, CancelToken, Stopped};
    ///
    /// fn build(token: &CancelToken, parts: &[&str]) -> Result<String, Stopped> {
    ///     let mut out = String::new();
    ///     for part in parts {
    ///         token.check()?;
    ///         out.push_str(part);
    ///     }
    ///     Ok(out)
    /// }
    ///
    /// let source = CancelSource::new();
    /// assert_eq!(build(&source.token(), &["a", "b"]).unwrap(), "ab");
    /// source.cancel();
    /// assert!(build(&source.token(), &["a", "b"]).is_err());
    /// ```
    pub fn check(&self) -> Result<(), Stopped> {
        match self.reason() {
            Some(reason) => Err(Stopped { reason }),
            None => Ok(()),
        }
    }

    /// The earliest deadline anywhere in the chain.
    pub fn deadline(&self) -> Option<Instant> {
        self.chain.iter().filter_map(|node| node.deadline()).min()
    }

    /// Wait for the token to fire.
    pub fn fired(&self) -> Fired {
        Fired::new(self.clone())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("depth", &self.chain.len())
            .field("deadline", &self.deadline())
            .field("reason", &self.reason())
            .finish()
    }
}

/// `None` if `timeout` is too large to be represented, which is the same as
/// having no deadline at all.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

#[cfg(test)]
mod test {
    use super::*;
    use async_io::Timer;
    use futures_lite::future::block_on;

    #[test]
    fn explicit_cancel() {
        let source = CancelSource::new();
        let token = source.token();
        assert_eq!(token.reason(), None);
        assert!(token.check().is_ok());

        assert!(source.cancel());
        assert_eq!(token.reason(), Some(Reason::Cancelled));
        assert_eq!(token.check().unwrap_err().reason(), Reason::Cancelled);
    }

    #[test]
    fn cancel_twice_changes_nothing() {
        let source = CancelSource::new();
        assert!(source.cancel());
        assert!(!source.cancel());
        assert_eq!(source.token().reason(), Some(Reason::Cancelled));
    }

    #[test]
    fn never_fires() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        assert_eq!(token.deadline(), None);
    }

    #[test]
    fn deadline_fires_as_timeout() {
        let token = CancelToken::after(Duration::from_millis(20));
        assert!(!token.is_cancelled());
        let reason = block_on(token.fired());
        assert_eq!(reason, Reason::Timeout);

        // Cancelling afterwards doesn't change the latched reason.
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(Reason::Timeout));
    }

    #[test]
    fn parent_cancels_child() {
        let parent = CancelSource::new();
        let child = parent.token().child();
        let grandchild = child.token().child();

        parent.cancel();
        assert_eq!(child.token().reason(), Some(Reason::Cancelled));
        assert_eq!(grandchild.token().reason(), Some(Reason::Cancelled));
    }

    #[test]
    fn child_does_not_cancel_parent() {
        let parent = CancelSource::new();
        let child = parent.token().child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn earliest_firing_decides_reason() {
        let parent = CancelToken::after(Duration::from_millis(10));
        let child = parent.child();
        block_on(Timer::after(Duration::from_millis(30)));

        // The parent's deadline passed before this explicit cancel.
        assert!(child.cancel());
        assert_eq!(child.token().reason(), Some(Reason::Timeout));
    }

    #[test]
    fn child_deadline_is_earliest_in_chain() {
        let parent = CancelToken::after(Duration::from_secs(60));
        let child = parent.child_with_timeout(Duration::from_millis(5));
        assert!(child.token().deadline() < parent.deadline());
    }

    #[test]
    fn fired_wakes_on_cancel_from_other_thread() {
        let source = CancelSource::new();
        let token = source.token();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            source.cancel();
        });
        assert_eq!(block_on(token.fired()), Reason::Cancelled);
        handle.join().unwrap();
    }

    #[test]
    fn fired_sees_ancestor_cancel() {
        let parent = CancelSource::new();
        let child = parent.token().child_with_timeout(Duration::from_secs(60));
        let token = child.token();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            parent.cancel();
        });
        assert_eq!(block_on(token.fired()), Reason::Cancelled);
        handle.join().unwrap();
    }

    #[test]
    fn stopped_into_io_error() {
        let err: io::Error = Stopped {
            reason: Reason::Timeout,
        }
        .into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
