//! Utilities to implement the different futures of this crate.

mod indexer;
mod pin;
mod wakers;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) use indexer::Indexer;
pub(crate) use pin::get_pin_mut;
pub(crate) use wakers::WakerVec;

/// Lock `mutex`, recovering the guard if a previous holder panicked.
///
/// None of the state guarded in this crate can be left half-updated by a
/// panic, so the poison flag carries no information.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
