use core::task::Waker;
use fixedbitset::FixedBitSet;

/// Tracks which operations were woken and should be polled again.
#[derive(Debug)]
pub(crate) struct ReadinessVec {
    readiness_list: FixedBitSet,
    parent_waker: Option<Waker>,
}

impl ReadinessVec {
    /// Create a new instance of readiness. Every index starts out ready so
    /// the first poll drives each operation at least once.
    pub(crate) fn new(len: usize) -> Self {
        let mut readiness_list = FixedBitSet::with_capacity(len);
        readiness_list.insert_range(..);
        Self {
            readiness_list,
            parent_waker: None,
        }
    }

    /// Set the ready state to `true` for the given index
    ///
    /// Returns the old ready state for this id
    pub(crate) fn set_ready(&mut self, index: usize) -> bool {
        self.readiness_list.put(index)
    }

    /// Move the current ready set into `out`, leaving every index not ready.
    pub(crate) fn take_ready(&mut self, out: &mut FixedBitSet) {
        out.clone_from(&self.readiness_list);
        self.readiness_list.clear();
    }

    /// Access the parent waker.
    #[inline]
    pub(crate) fn parent_waker(&self) -> Option<&Waker> {
        self.parent_waker.as_ref()
    }

    /// Set the parent `Waker`. This needs to be called at the start of every
    /// `poll` function.
    pub(crate) fn set_waker(&mut self, parent_waker: &Waker) {
        match &mut self.parent_waker {
            Some(prev) => prev.clone_from(parent_waker),
            None => self.parent_waker = Some(parent_waker.clone()),
        }
    }
}
