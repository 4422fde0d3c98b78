use core::fmt;
use std::error::Error;

use crate::cancel::Reason;
use crate::operation::Label;

/// The outcome of a race: exactly one per race.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a race result reports whether anything won"]
pub enum RaceResult<T, E> {
    /// An operation succeeded before anything else happened.
    Winner {
        /// The winning operation.
        label: Label,
        /// The value it produced.
        value: T,
    },
    /// A deadline passed before any operation finished.
    Timeout,
    /// The caller's token was cancelled before any operation finished.
    Cancelled,
    /// An operation failed before anything else happened.
    Error {
        /// The failing operation.
        label: Label,
        /// Why it failed.
        cause: E,
    },
}

impl<T, E> RaceResult<T, E> {
    /// Returns `true` if an operation won the race.
    pub fn is_winner(&self) -> bool {
        matches!(self, RaceResult::Winner { .. })
    }

    /// The label of the operation which decided the race, if any did.
    pub fn label(&self) -> Option<&Label> {
        match self {
            RaceResult::Winner { label, .. } | RaceResult::Error { label, .. } => Some(label),
            RaceResult::Timeout | RaceResult::Cancelled => None,
        }
    }

    /// The winning label and value, discarding any failure.
    pub fn winner(self) -> Option<(Label, T)> {
        match self {
            RaceResult::Winner { label, value } => Some((label, value)),
            RaceResult::Timeout | RaceResult::Cancelled | RaceResult::Error { .. } => None,
        }
    }

    /// Convert into a `Result`, for use with `?`.
    pub fn into_result(self) -> Result<(Label, T), RaceError<E>> {
        match self {
            RaceResult::Winner { label, value } => Ok((label, value)),
            RaceResult::Timeout => Err(RaceError::Timeout),
            RaceResult::Cancelled => Err(RaceError::Cancelled),
            RaceResult::Error { label, cause } => Err(RaceError::Operation { label, cause }),
        }
    }

    /// Map the winning value, leaving every other outcome untouched.
    pub fn map<U, F>(self, f: F) -> RaceResult<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            RaceResult::Winner { label, value } => RaceResult::Winner {
                label,
                value: f(value),
            },
            RaceResult::Timeout => RaceResult::Timeout,
            RaceResult::Cancelled => RaceResult::Cancelled,
            RaceResult::Error { label, cause } => RaceResult::Error { label, cause },
        }
    }
}

impl<T, E> From<Reason> for RaceResult<T, E> {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Cancelled => RaceResult::Cancelled,
            Reason::Timeout => RaceResult::Timeout,
        }
    }
}

/// Why a race produced no winner.
///
/// This is the error side of [`RaceResult::into_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceError<E> {
    /// A deadline passed before any operation finished.
    Timeout,
    /// The caller's token was cancelled before any operation finished.
    Cancelled,
    /// An operation failed first.
    Operation {
        /// The failing operation.
        label: Label,
        /// Why it failed.
        cause: E,
    },
}

impl<E: fmt::Display> fmt::Display for RaceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceError::Timeout => f.write_str("timed out before any operation finished"),
            RaceError::Cancelled => f.write_str("cancelled before any operation finished"),
            RaceError::Operation { label, cause } => {
                write!(f, "operation `{label}` failed: {cause}")
            }
        }
    }
}

impl<E: Error + 'static> Error for RaceError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RaceError::Operation { cause, .. } => Some(cause),
            RaceError::Timeout | RaceError::Cancelled => None,
        }
    }
}

/// The error returned when racing zero operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyRace;

impl fmt::Display for EmptyRace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cannot race an empty set of operations")
    }
}

impl Error for EmptyRace {}
