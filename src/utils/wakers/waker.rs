use std::sync::{Arc, Mutex};
use std::task::Wake;

use super::ReadinessVec;
use crate::utils::lock;

/// An efficient waker which delegates wake events.
#[derive(Debug, Clone)]
pub(crate) struct InlineWakerVec {
    id: usize,
    readiness: Arc<Mutex<ReadinessVec>>,
}

impl InlineWakerVec {
    /// Create a new instance of `InlineWakerVec`.
    pub(crate) fn new(id: usize, readiness: Arc<Mutex<ReadinessVec>>) -> Self {
        Self { id, readiness }
    }
}

impl Wake for InlineWakerVec {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let parent = {
            let mut readiness = lock(&self.readiness);
            if readiness.set_ready(self.id) {
                // Already queued, the parent has been notified.
                return;
            }
            readiness.parent_waker().cloned()
        };
        if let Some(waker) = parent {
            waker.wake();
        }
    }
}
