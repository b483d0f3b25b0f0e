//! Thread count and chunk size selection.
//!
//! The planner is stateless: every answer is a pure function of the range,
//! the configuration and the platform thread limit. Splitting only pays off
//! once each worker gets at least `min_thread_interval` numbers, and larger
//! stops need larger chunks because every engine instance first regenerates
//! its sieving primes up to `sqrt(stop)`.

use crate::{SieveConfiguration, SieveRange};

/// Number of hardware threads, at least 1.
pub fn max_threads() -> usize {
    num_cpus::get().max(1)
}

/// Chooses how many workers to run and how large their chunks are.
///
/// # Example
/// ```
/// use parsieve::{IntervalPlanner, SieveConfiguration, SieveRange};
///
/// let range = SieveRange::new(0, 1_000_000).unwrap();
/// let planner = IntervalPlanner::new(range, &SieveConfiguration::default(), 8);
///
/// // A million numbers is far below the default minimum per-thread interval.
/// assert_eq!(planner.num_threads(), 1);
/// assert_eq!(planner.ideal_interval(), 1_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPlanner {
    range: SieveRange,
    requested_threads: Option<usize>,
    ordered_output: bool,
    min_thread_interval: u64,
    max_threads: usize,
}

impl IntervalPlanner {
    /// Planner for `range` under `config`, with at most `max_threads`
    /// workers. A `max_threads` of zero is treated as one.
    pub fn new(range: SieveRange, config: &SieveConfiguration, max_threads: usize) -> Self {
        Self {
            range,
            requested_threads: config.requested_threads(),
            ordered_output: config.flags().requires_ordered_output(),
            min_thread_interval: config.min_thread_interval(),
            max_threads: max_threads.max(1),
        }
    }

    pub const fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Worker count for the run.
    ///
    /// The requested count when it lies in `[1, max_threads]`, otherwise
    /// [`ideal_num_threads`](Self::ideal_num_threads). Printing primes or
    /// k-tuplets always runs on one thread, whatever was requested, so the
    /// output stays in increasing order.
    pub fn num_threads(&self) -> usize {
        if self.ordered_output {
            return 1;
        }
        match self.requested_threads {
            Some(n) if (1..=self.max_threads).contains(&n) => n,
            _ => self.ideal_num_threads(),
        }
    }

    /// Thread count that keeps every worker busy with at least
    /// `max(min_thread_interval, sqrt(stop) / 6)` numbers.
    pub fn ideal_num_threads(&self) -> usize {
        if self.ordered_output {
            return 1;
        }
        let threshold = self
            .min_thread_interval
            .max(self.range.stop().isqrt() / 6)
            .max(1);
        let ideal = self.range.len() / threshold;
        usize::try_from(ideal)
            .unwrap_or(usize::MAX)
            .clamp(1, self.max_threads)
    }

    /// Numbers per chunk.
    ///
    /// The whole interval for a single thread. Otherwise the smaller of
    /// `max(min_thread_interval, sqrt(stop) * 2000)` and an even share per
    /// thread; if the even share would fall below `min_thread_interval` it
    /// is recomputed with [`ideal_num_threads`](Self::ideal_num_threads).
    pub fn ideal_interval(&self) -> u64 {
        let len = self.range.len();
        let threads = self.num_threads();
        if threads == 1 {
            return len;
        }
        let ideal = self
            .min_thread_interval
            .max(self.range.stop().isqrt().saturating_mul(2000));
        let mut cap = len / threads as u64;
        if cap < len && cap < self.min_thread_interval {
            cap = len / self.ideal_num_threads() as u64;
        }
        ideal.min(cap)
    }
}
