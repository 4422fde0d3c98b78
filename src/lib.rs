//! Cancellable, deadline-bounded races for async Rust.
//!
//! Start several operations which compute the same kind of value, take
//! whichever finishes first, and tell the rest to stop. A race always ends in
//! exactly one of four ways: a winner, a failure, a timeout, or a
//! cancellation by the caller.
//!
//! See the [`race`], [`operation`] and [`cancel`] submodules for more.
//!
//! # Building blocks
//!
//! - [`cancel::CancelSource`] / [`cancel::CancelToken`]: a one-shot signal,
//!   optionally with a deadline, which can be chained from a parent token.
//! - [`operation::Operation`]: a labeled unit of work started with a token.
//!   Use [`operation::from_fn`] for async work and [`operation::blocking`] for
//!   synchronous work run on its own thread.
//! - [`race::Race`] / [`race::Coordinator`]: run the race and produce a
//!   [`race::RaceResult`].
//!
//! # Examples
//!
//! Race a fast and a slow lookup, giving up after one second:
//! ```rust
//! use futures_race::prelude::*;
//! use futures_race::{from_fn, CancelToken, RaceResult};
//! use futures_lite::future::block_on;
//! use std::time::Duration;
//!
//! block_on(async {
//!     let ops = vec![
//!         from_fn("cache", |_stop| async { Ok::<_, std::io::Error>(7) }).boxed(),
//!         from_fn("database", |stop: CancelToken| async move {
//!             stop.fired().await;
//!             Ok(0)
//!         })
//!         .boxed(),
//!     ];
//!     let token = CancelToken::after(Duration::from_secs(1));
//!     let res = ops.race_until(&token).unwrap().await;
//!     assert_eq!(res.winner(), Some(("cache".into(), 7)));
//! })
//! ```
//!
//! # Limitations
//!
//! Stopping is cooperative. Async operations stop when their future is
//! dropped, which happens as soon as the race is decided. Blocking operations
//! run on a thread which can't be interrupted: they stop early only if they
//! check their token, and otherwise their result is discarded when it
//! arrives.

#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod utils;

pub mod cancel;
pub mod operation;
pub mod race;

/// The futures race prelude.
pub mod prelude {
    pub use super::operation::Operation as _;
    pub use super::race::Race as _;
}

pub use cancel::{CancelSource, CancelToken, Reason};
pub use operation::{blocking, from_fn, Label, Operation};
pub use race::{Coordinator, EmptyRace, FailurePolicy, Race, RaceError, RaceResult};
