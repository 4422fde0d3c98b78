//! Per-operation wakers which record which operations asked to be polled.

mod readiness;
mod waker;
mod waker_vec;

use readiness::ReadinessVec;
use waker::InlineWakerVec;

pub(crate) use waker_vec::WakerVec;
