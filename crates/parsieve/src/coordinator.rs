//! Splitting one sieve run across a pool of scoped worker threads.

use crate::{
    Aggregator, ChunkPlan, ChunkSink, Error, IntervalPlanner, PatternCounters, PrimeCallback,
    Result, SegmentedSieve, SieveConfiguration, SieveEngine, SieveRange, StatusChannel,
};
use core::time::Duration;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How a run is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionStrategy {
    /// One engine call over the whole range on the calling thread.
    Sequential,
    /// Wheel-aligned chunks pulled by a pool of scoped worker threads.
    Pooled,
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SieveOutcome {
    pub counters: PatternCounters,
    pub elapsed: Duration,
}

impl SieveOutcome {
    /// Elapsed wall time in seconds.
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Parallel sieve coordinator.
///
/// Plans thread count and chunk size with [`IntervalPlanner`], splits the
/// range into a [`ChunkPlan`] whose interior boundaries never cut a
/// k-tuplet, and lets `num_threads` workers claim chunks from a shared
/// cursor until none are left. Faster workers simply claim more chunks.
/// Each chunk runs on its own engine call; results are merged into a
/// run-scoped [`Aggregator`], and engines that report per-segment progress
/// keep the attached status channel live while a chunk is sieved.
///
/// The configuration is fixed at construction. A coordinator can be reused
/// for any number of runs, each starting from zeroed counters.
///
/// # Example
/// ```
/// use parsieve::{Flags, ParallelSieve, Pattern, SieveConfiguration, SieveRange};
///
/// let config = SieveConfiguration::builder()
///     .flags(Flags::COUNT_PRIMES | Flags::COUNT_TWINS)
///     .min_thread_interval(10_000)
///     .build()
///     .unwrap();
/// let sieve = ParallelSieve::new(config).with_max_threads(4);
///
/// let outcome = sieve.run(SieveRange::new(0, 1_000_000).unwrap()).unwrap();
/// assert_eq!(outcome.counters[Pattern::Primes], 78_498);
/// assert_eq!(outcome.counters[Pattern::Twins], 8_169);
/// ```
pub struct ParallelSieve<E = SegmentedSieve> {
    config: SieveConfiguration,
    engine: E,
    status: Option<Arc<dyn StatusChannel>>,
    strategy: Option<ExecutionStrategy>,
    max_threads: usize,
}

impl ParallelSieve<SegmentedSieve> {
    /// Coordinator over the reference [`SegmentedSieve`] engine, using every
    /// hardware thread.
    pub fn new(config: SieveConfiguration) -> Self {
        Self {
            config,
            engine: SegmentedSieve::new(),
            status: None,
            strategy: None,
            max_threads: crate::max_threads(),
        }
    }

    /// Builds a coordinator from the inputs held by a status channel and
    /// attaches the channel to it.
    ///
    /// # Errors
    /// - [`Error::InvalidConfiguration`] if `status` is `None` or carries an
    ///   invalid segment size.
    /// - [`Error::InvalidRange`] if the channel's range is invalid.
    pub fn from_status_channel(
        status: Option<Arc<dyn StatusChannel>>,
    ) -> Result<(Self, SieveRange)> {
        let status = status.ok_or_else(|| Error::InvalidConfiguration {
            reason: "status channel is missing".to_string(),
        })?;
        let inputs = status.inputs();
        let range = inputs.range()?;
        let sieve = Self::new(inputs.configuration()?).with_status_channel(status);
        Ok((sieve, range))
    }
}

impl<E: SieveEngine> ParallelSieve<E> {
    /// Replaces the engine, keeping every other setting.
    pub fn with_engine<F: SieveEngine>(self, engine: F) -> ParallelSieve<F> {
        ParallelSieve {
            config: self.config,
            engine,
            status: self.status,
            strategy: self.strategy,
            max_threads: self.max_threads,
        }
    }

    /// Mirrors every run's progress into `status`.
    #[must_use]
    pub fn with_status_channel(mut self, status: Arc<dyn StatusChannel>) -> Self {
        self.status = Some(status);
        self
    }

    /// Pins the execution strategy instead of deriving it from
    /// [`max_threads`](Self::max_threads).
    #[must_use]
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Overrides the platform thread limit. Zero is treated as one.
    #[must_use]
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = if max_threads == 0 { 1 } else { max_threads };
        self
    }

    pub const fn config(&self) -> &SieveConfiguration {
        &self.config
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// The pinned strategy, or [`ExecutionStrategy::Sequential`] when only
    /// one thread is available and [`ExecutionStrategy::Pooled`] otherwise.
    pub const fn strategy(&self) -> ExecutionStrategy {
        match self.strategy {
            Some(strategy) => strategy,
            None if self.max_threads == 1 => ExecutionStrategy::Sequential,
            None => ExecutionStrategy::Pooled,
        }
    }

    /// Requests `threads` workers for later runs.
    ///
    /// Values outside `[1, max_threads]` are not an error; runs fall back
    /// to [`ideal_num_threads`](Self::ideal_num_threads).
    pub fn set_num_threads(&mut self, threads: usize) {
        self.config = self.config.with_requested_threads(Some(threads));
    }

    pub fn planner(&self, range: SieveRange) -> IntervalPlanner {
        IntervalPlanner::new(range, &self.config, self.max_threads)
    }

    /// Workers a run over `range` will use.
    pub fn num_threads(&self, range: SieveRange) -> usize {
        match self.strategy() {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::Pooled => self.planner(range).num_threads(),
        }
    }

    pub fn ideal_num_threads(&self, range: SieveRange) -> usize {
        self.planner(range).ideal_num_threads()
    }

    pub fn ideal_interval(&self, range: SieveRange) -> u64 {
        self.planner(range).ideal_interval()
    }

    /// The chunks a pooled run over `range` would dispatch.
    pub fn chunk_plan(&self, range: SieveRange) -> ChunkPlan {
        ChunkPlan::new(range, self.ideal_interval(range))
    }

    /// Sieves `range` and returns the merged counters.
    ///
    /// # Errors
    /// - The first error returned by the engine; remaining chunks are not
    ///   started.
    /// - Any error returned by the attached status channel.
    /// - [`Error::LockPoisoned`] without the `parking-lot` feature.
    pub fn run(&self, range: SieveRange) -> Result<SieveOutcome> {
        self.execute(range, None)
    }

    /// Sieves `range`, passing every prime found to `callback`.
    ///
    /// Primes arrive in increasing order only when the run uses one thread.
    /// With several workers each chunk is still delivered in order, tagged
    /// with its chunk index, but chunks interleave.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub fn run_with_callback(
        &self,
        range: SieveRange,
        callback: &dyn PrimeCallback,
    ) -> Result<SieveOutcome> {
        self.execute(range, Some(callback))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, callback),
            fields(start = range.start(), stop = range.stop())
        )
    )]
    fn execute(
        &self,
        range: SieveRange,
        callback: Option<&dyn PrimeCallback>,
    ) -> Result<SieveOutcome> {
        let aggregator = Aggregator::new(range.len(), self.config.flags(), self.status.as_deref());
        let threads = self.num_threads(range);

        if threads == 1 {
            #[cfg(feature = "tracing")]
            tracing::debug!(strategy = ?self.strategy(), "sieving on the calling thread");
            let sink = callback.map(|callback| ChunkSink::new(callback, 0));
            let progress = aggregator.chunk_progress(range.len());
            let counters = self.engine.sieve_with_progress(
                range.start(),
                range.stop(),
                &self.config,
                sink,
                &progress,
            )?;
            aggregator.complete_chunk(&counters, progress.remaining())?;
        } else {
            let plan = self.chunk_plan(range);
            let workers = threads.min(plan.len());
            #[cfg(feature = "tracing")]
            tracing::debug!(chunks = plan.len(), workers, "dispatching chunks");
            self.run_pool(&plan, workers, callback, &aggregator)?;
        }

        let (counters, progress) = aggregator.finish()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(elapsed = ?progress.elapsed(), "run complete");
        Ok(SieveOutcome {
            counters,
            elapsed: progress.elapsed(),
        })
    }

    fn run_pool(
        &self,
        plan: &ChunkPlan,
        workers: usize,
        callback: Option<&dyn PrimeCallback>,
        aggregator: &Aggregator<'_>,
    ) -> Result<()> {
        let cursor = ChunkCursor::new();
        let failed = AtomicBool::new(false);
        let first_error = OnceLock::new();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while !failed.load(Ordering::Acquire) {
                        let Some(chunk) = plan.get(cursor.claim()) else {
                            break;
                        };
                        let sink = callback.map(|callback| ChunkSink::new(callback, chunk.index));
                        let progress = aggregator.chunk_progress(chunk.len());
                        let result = self
                            .engine
                            .sieve_with_progress(
                                chunk.start,
                                chunk.stop,
                                &self.config,
                                sink,
                                &progress,
                            )
                            .and_then(|counters| {
                                aggregator.complete_chunk(&counters, progress.remaining())
                            });
                        if let Err(err) = result {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(chunk = chunk.index, error = %err, "aborting run");
                            failed.store(true, Ordering::Release);
                            let _ = first_error.set(err);
                            break;
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<E> core::fmt::Debug for ParallelSieve<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParallelSieve")
            .field("config", &self.config)
            .field("status", &self.status.is_some())
            .field("strategy", &self.strategy)
            .field("max_threads", &self.max_threads)
            .finish_non_exhaustive()
    }
}

/// Next unclaimed chunk index, shared by all workers of a run.
struct ChunkCursor {
    #[cfg(feature = "cache-padded")]
    next: crossbeam_utils::CachePadded<AtomicUsize>,
    #[cfg(not(feature = "cache-padded"))]
    next: AtomicUsize,
}

impl ChunkCursor {
    fn new() -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            next: crossbeam_utils::CachePadded::new(AtomicUsize::new(0)),
            #[cfg(not(feature = "cache-padded"))]
            next: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn claim(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
