//! Visibility tracking error types

use thiserror::Error;

use crate::registry::WatchId;

/// A callback that panicked during a poll pass
#[derive(Debug, Clone)]
pub struct CallbackFailure {
    /// The watch whose callback panicked
    pub watch: WatchId,
    /// Whether the panic happened in the enter callback (`false` = leave)
    pub entered: bool,
    /// Panic payload, when it was a string
    pub message: String,
}

/// Visibility tracking errors
#[derive(Error, Debug)]
pub enum VisibilityError {
    /// Visibility threshold outside `0.0..=1.0` (or NaN)
    #[error("Invalid visibility threshold {0}: expected a fraction between 0.0 and 1.0")]
    InvalidThreshold(f32),

    /// Detection distance is not a finite number
    #[error("Invalid detection distance {0}: expected a finite number of pixels")]
    InvalidDistance(f32),

    /// The watch is not (or no longer) registered
    #[error("Unknown watch: {0:?}")]
    UnknownWatch(WatchId),

    /// One or more callbacks panicked during a poll pass
    ///
    /// The pass itself ran to completion; every other entry was evaluated.
    #[error("{} visibility callback(s) panicked during poll", .failures.len())]
    CallbackPanicked {
        /// One record per panicking callback, in evaluation order
        failures: Vec<CallbackFailure>,
    },
}

/// Result type for visibility operations
pub type Result<T> = std::result::Result<T, VisibilityError>;
