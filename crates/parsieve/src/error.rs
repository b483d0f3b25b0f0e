//! Error types for parallel sieving.
//!
//! Every fallible operation in this crate returns [`Result`], whose error is
//! the central [`Error`] enum. Errors are surfaced before any chunk is
//! dispatched whenever they can be detected up front (bad ranges, bad
//! configuration); engine and I/O failures abort the run in progress.
//!
//! ## Error Cases
//! - `InvalidRange`: `stop < start`, or a bound exceeds the engine limit.
//! - `InvalidConfiguration`: a configuration value or required handle is
//!   missing or outside its accepted domain.
//! - `Engine`: the sequential engine failed on one chunk.
//! - `Io`: printing primes or k-tuplets to the output failed.
//! - `LockPoisoned`: a thread panicked while holding a lock.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for parallel sieving.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The requested interval is empty or outside the supported domain.
    #[error("Invalid range [{start}, {stop}]: {reason}")]
    InvalidRange {
        start: u64,
        stop: u64,
        reason: &'static str,
    },

    /// A configuration value or a required handle is invalid.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The sequential engine failed to sieve a chunk.
    #[error("Engine failed on [{start}, {stop}]: {reason}")]
    Engine {
        start: u64,
        stop: u64,
        reason: String,
    },

    /// Writing printed primes or k-tuplets failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a worker panics while holding the aggregator lock,
    /// or a thread panicked while writing to a [`crate::PrintTarget::Shared`]
    /// writer. With the `parking-lot` feature the aggregator lock does
    /// **not** poison.
    #[error("Lock poisoned")]
    LockPoisoned,
}

use std::sync::{MutexGuard, PoisonError};

impl<T: ?Sized> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
