use core::task::Waker;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use slab::Slab;

use super::Reason;
use crate::utils::lock;

/// When and why a node fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Firing {
    pub(crate) reason: Reason,
    pub(crate) at: Instant,
}

/// A single link in a cancellation chain.
///
/// A node fires at most once. It fires either through an explicit call to
/// [`Node::cancel`] or because its deadline has passed, and the first of
/// those to be observed is latched forever.
#[derive(Debug)]
pub(crate) struct Node {
    deadline: Option<Instant>,
    firing: OnceLock<Firing>,
    waiters: Mutex<Slab<Waker>>,
}

impl Node {
    pub(crate) fn new(deadline: Option<Instant>) -> Self {
        Self {
            deadline,
            firing: OnceLock::new(),
            waiters: Mutex::new(Slab::new()),
        }
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns how this node fired, latching an elapsed deadline.
    pub(crate) fn firing(&self, now: Instant) -> Option<Firing> {
        if let Some(firing) = self.firing.get() {
            return Some(*firing);
        }
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.fire(Firing {
                    reason: Reason::Timeout,
                    at: deadline,
                });
                self.firing.get().copied()
            }
            _ => None,
        }
    }

    /// Fire explicitly. Returns `true` if this call is the one that fired
    /// the node.
    pub(crate) fn cancel(&self, now: Instant) -> bool {
        // A deadline that already passed wins, even if nobody looked yet.
        if self.firing(now).is_some() {
            return false;
        }
        self.fire(Firing {
            reason: Reason::Cancelled,
            at: now,
        })
    }

    fn fire(&self, firing: Firing) -> bool {
        if self.firing.set(firing).is_err() {
            return false;
        }
        let waiters: Vec<Waker> = lock(&self.waiters).drain().collect();
        for waker in waiters {
            waker.wake();
        }
        true
    }

    /// Register `waker` to be woken when the node fires.
    ///
    /// Returns `false`, registering nothing, if the node already fired.
    pub(crate) fn register(&self, key: &mut Option<usize>, waker: &Waker) -> bool {
        let mut waiters = lock(&self.waiters);
        // Checked under the lock: `fire` publishes before draining.
        if self.firing.get().is_some() {
            return false;
        }
        match *key {
            Some(existing) if waiters.contains(existing) => waiters[existing].clone_from(waker),
            _ => *key = Some(waiters.insert(waker.clone())),
        }
        true
    }

    pub(crate) fn deregister(&self, key: usize) {
        lock(&self.waiters).try_remove(key);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_idempotent() {
        let node = Node::new(None);
        let now = Instant::now();
        assert!(node.cancel(now));
        assert!(!node.cancel(now + Duration::from_secs(1)));
        assert_eq!(
            node.firing(Instant::now()),
            Some(Firing {
                reason: Reason::Cancelled,
                at: now
            })
        );
    }

    #[test]
    fn elapsed_deadline_beats_late_cancel() {
        let deadline = Instant::now();
        let node = Node::new(Some(deadline));
        assert!(!node.cancel(deadline + Duration::from_millis(1)));
        assert_eq!(
            node.firing(Instant::now()).map(|firing| firing.reason),
            Some(Reason::Timeout)
        );
    }

    #[test]
    fn register_after_fire_is_refused() {
        let node = Node::new(None);
        node.cancel(Instant::now());
        let mut key = None;
        assert!(!node.register(&mut key, futures::task::noop_waker_ref()));
        assert_eq!(key, None);
    }
}
