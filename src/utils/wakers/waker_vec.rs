use std::sync::{Arc, Mutex, MutexGuard};
use std::task::Waker;

use super::{InlineWakerVec, ReadinessVec};
use crate::utils::lock;

/// A collection of wakers which delegate to an in-line waker.
#[derive(Debug)]
pub(crate) struct WakerVec {
    wakers: Vec<Waker>,
    readiness: Arc<Mutex<ReadinessVec>>,
}

impl WakerVec {
    /// Create a new instance of `WakerVec`.
    pub(crate) fn new(len: usize) -> Self {
        let readiness = Arc::new(Mutex::new(ReadinessVec::new(len)));
        let wakers = (0..len)
            .map(|i| Arc::new(InlineWakerVec::new(i, readiness.clone())).into())
            .collect();
        Self { wakers, readiness }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Waker> {
        self.wakers.get(index)
    }

    /// Lock and access the `ReadinessVec`.
    pub(crate) fn readiness(&self) -> MutexGuard<'_, ReadinessVec> {
        lock(&self.readiness)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fixedbitset::FixedBitSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn wakes_parent_once_per_index() {
        let parent = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let wakers = WakerVec::new(2);
        let mut ready = FixedBitSet::new();
        {
            let mut readiness = wakers.readiness();
            readiness.set_waker(&Waker::from(parent.clone()));
            readiness.take_ready(&mut ready);
        }

        wakers.get(1).unwrap().wake_by_ref();
        wakers.get(1).unwrap().wake_by_ref();
        assert_eq!(parent.0.load(Ordering::SeqCst), 1);

        wakers.get(0).unwrap().wake_by_ref();
        assert_eq!(parent.0.load(Ordering::SeqCst), 2);

        wakers.readiness().take_ready(&mut ready);
        assert_eq!(ready.ones().collect::<Vec<_>>(), [0, 1]);
    }
}
