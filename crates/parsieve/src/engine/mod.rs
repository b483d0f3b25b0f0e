mod segmented;
mod wheel;

pub use segmented::*;
pub use wheel::*;

use crate::{ChunkSink, PatternCounters, ProgressReporter, Result, SieveConfiguration};

/// A sequential sieve over one sub-range.
///
/// The coordinator calls [`sieve`](Self::sieve) once per chunk, possibly from
/// several threads at once, so engines must be [`Sync`]. Any per-chunk state
/// (segment buffers, sieving primes) lives inside the call.
///
/// Contract:
/// - Only numbers in `[start, stop]` are examined.
/// - A k-tuplet is counted only when all of its members lie in
///   `[start, stop]`, and only for patterns whose `COUNT_*` flag is set.
/// - `sink`, when present, receives every prime of the sub-range exactly once
///   and in increasing order, synchronously, before `sieve` returns.
///
/// Engines that work segment by segment should also override
/// [`sieve_with_progress`](Self::sieve_with_progress) so status updates stay
/// live while a long chunk is sieved.
pub trait SieveEngine: Sync {
    /// Sieves `[start, stop]` and returns the pattern counts.
    ///
    /// # Errors
    /// Implementations report failures as [`crate::Error`]; the coordinator
    /// aborts the whole run on the first one.
    fn sieve(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
    ) -> Result<PatternCounters>;

    /// Like [`sieve`](Self::sieve), reporting progress to `progress` as it
    /// goes. The default reports nothing; the coordinator then accounts the
    /// whole chunk when it completes.
    ///
    /// # Errors
    /// As [`sieve`](Self::sieve), plus any error returned by `progress`.
    fn sieve_with_progress(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
        progress: &dyn ProgressReporter,
    ) -> Result<PatternCounters> {
        let _ = progress;
        self.sieve(start, stop, config, sink)
    }
}

impl<E: SieveEngine + ?Sized> SieveEngine for &E {
    fn sieve(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
    ) -> Result<PatternCounters> {
        (**self).sieve(start, stop, config, sink)
    }

    fn sieve_with_progress(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
        progress: &dyn ProgressReporter,
    ) -> Result<PatternCounters> {
        (**self).sieve_with_progress(start, stop, config, sink, progress)
    }
}

impl<E: SieveEngine + ?Sized + Send> SieveEngine for std::sync::Arc<E> {
    fn sieve(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
    ) -> Result<PatternCounters> {
        (**self).sieve(start, stop, config, sink)
    }

    fn sieve_with_progress(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
        progress: &dyn ProgressReporter,
    ) -> Result<PatternCounters> {
        (**self).sieve_with_progress(start, stop, config, sink, progress)
    }
}
