use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cancel::{CancelSource, CancelToken};

/// Bookkeeping for one race.
///
/// The session derives its own cancellation source from the caller's token.
/// Every operation in the race is started with the session's token, so both
/// the caller giving up and the race resolving tell every operation to stop.
#[derive(Debug)]
pub(crate) struct RaceSession {
    resolved: AtomicBool,
    stop: CancelSource,
}

impl RaceSession {
    pub(crate) fn new(caller: &CancelToken, deadline: Option<Duration>) -> Self {
        let stop = match deadline {
            Some(deadline) => caller.child_with_timeout(deadline),
            None => caller.child(),
        };
        Self {
            resolved: AtomicBool::new(false),
            stop,
        }
    }

    pub(crate) fn token(&self) -> CancelToken {
        self.stop.token()
    }

    /// Claim the single result of this session and stop every operation.
    ///
    /// Returns `false` if the session was already resolved.
    pub(crate) fn try_resolve(&self) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.stop.cancel();
        true
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

impl Drop for RaceSession {
    fn drop(&mut self) {
        // An abandoned race stops its operations too.
        self.stop.cancel();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cancel::Reason;

    #[test]
    fn resolves_once() {
        let session = RaceSession::new(&CancelToken::never(), None);
        let token = session.token();
        assert!(!token.is_cancelled());

        assert!(session.try_resolve());
        assert!(!session.try_resolve());
        assert!(session.is_resolved());
        assert_eq!(token.reason(), Some(Reason::Cancelled));
    }

    #[test]
    fn drop_stops_operations() {
        let session = RaceSession::new(&CancelToken::never(), None);
        let token = session.token();
        drop(session);
        assert!(token.is_cancelled());
    }

    #[test]
    fn follows_caller() {
        let caller = CancelSource::new();
        let session = RaceSession::new(&caller.token(), Some(Duration::from_secs(60)));
        caller.cancel();
        assert_eq!(session.token().reason(), Some(Reason::Cancelled));
        assert!(!session.is_resolved());
    }
}
