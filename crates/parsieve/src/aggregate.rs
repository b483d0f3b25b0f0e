//! Run-scoped accumulation of counters and progress.

use crate::mutex::Mutex;
use crate::{
    Flags, PatternCounters, ProgressReporter, ProgressState, Result, StatusChannel, StatusSnapshot,
};
use core::cell::Cell;
use std::io::Write;
use std::time::Instant;

#[derive(Debug)]
struct AggregateState {
    counters: PatternCounters,
    progress: ProgressState,
    printed_percent: Option<u64>,
}

/// Merges per-chunk results of one run.
///
/// All mutation happens under a single lock, and the attached
/// [`StatusChannel`] is published to while that lock is held, so observers
/// see counters and progress that belong together and `percent` never goes
/// backwards. An aggregator lives for exactly one run.
///
/// With [`Flags::PRINT_STATUS`] set, `\rNN%` is written to stderr every time
/// the integer percentage grows.
pub struct Aggregator<'a> {
    state: Mutex<AggregateState>,
    status: Option<&'a dyn StatusChannel>,
    print_status: bool,
    started: Instant,
}

impl<'a> Aggregator<'a> {
    /// Fresh aggregator for an interval of `total` numbers.
    pub fn new(total: u64, flags: Flags, status: Option<&'a dyn StatusChannel>) -> Self {
        Self {
            state: Mutex::new(AggregateState {
                counters: PatternCounters::new(),
                progress: ProgressState::new(total),
                printed_percent: None,
            }),
            status,
            print_status: flags.contains(Flags::PRINT_STATUS),
            started: Instant::now(),
        }
    }

    /// Adds one chunk's counters.
    pub fn merge(&self, counters: &PatternCounters) -> Result<()> {
        crate::mutex::lock(&self.state)?.counters.merge(counters);
        Ok(())
    }

    /// Advances progress by `processed` numbers and reports it.
    pub fn advance(&self, processed: u64) -> Result<()> {
        let mut state = crate::mutex::lock(&self.state)?;
        state.progress.advance(processed);
        self.report(&mut state)
    }

    /// Merges a completed chunk and advances progress in one step.
    pub fn complete_chunk(&self, counters: &PatternCounters, processed: u64) -> Result<()> {
        let mut state = crate::mutex::lock(&self.state)?;
        state.counters.merge(counters);
        state.progress.advance(processed);
        self.report(&mut state)
    }

    /// Reporter for one chunk of `len` numbers, fed by the engine while it
    /// sieves. Pass [`ChunkProgress::remaining`] to
    /// [`complete_chunk`](Self::complete_chunk) once the chunk is done.
    pub fn chunk_progress(&self, len: u64) -> ChunkProgress<'_, 'a> {
        ChunkProgress {
            aggregator: self,
            remaining: Cell::new(len),
        }
    }

    /// Current counters and progress.
    pub fn snapshot(&self) -> Result<StatusSnapshot> {
        let state = crate::mutex::lock(&self.state)?;
        Ok(StatusSnapshot {
            percent: state.progress.percent(),
            counters: state.counters,
            elapsed: self.started.elapsed(),
        })
    }

    /// Pins progress at 100%, records the elapsed time and publishes the
    /// final snapshot.
    pub fn finish(self) -> Result<(PatternCounters, ProgressState)> {
        let mut state = crate::mutex::lock(&self.state)?;
        state.progress.finish(self.started.elapsed());
        self.report(&mut state)?;
        if self.print_status {
            std::io::stderr().write_all(b"\n")?;
        }
        Ok((state.counters, state.progress))
    }

    fn report(&self, state: &mut AggregateState) -> Result<()> {
        state.progress.set_elapsed(self.started.elapsed());
        if let Some(status) = self.status {
            status.publish(&StatusSnapshot {
                percent: state.progress.percent(),
                counters: state.counters,
                elapsed: state.progress.elapsed(),
            })?;
        }
        if self.print_status {
            let percent = state.progress.percent() as u64;
            if state.printed_percent.is_none_or(|p| percent > p) {
                state.printed_percent = Some(percent);
                let mut err = std::io::stderr().lock();
                write!(err, "\r{percent}%")?;
                err.flush()?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Aggregator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Aggregator")
            .field("state", &self.state)
            .field("print_status", &self.print_status)
            .finish_non_exhaustive()
    }
}

/// Per-segment progress of one chunk.
///
/// Reports are clamped so the chunk never advances the run by more than its
/// own length, whatever the engine reports.
pub struct ChunkProgress<'r, 'a> {
    aggregator: &'r Aggregator<'a>,
    remaining: Cell<u64>,
}

impl ChunkProgress<'_, '_> {
    /// Numbers of the chunk not reported yet.
    pub fn remaining(&self) -> u64 {
        self.remaining.get()
    }
}

impl ProgressReporter for ChunkProgress<'_, '_> {
    fn report(&self, processed: u64) -> Result<()> {
        let step = processed.min(self.remaining.get());
        self.remaining.set(self.remaining.get() - step);
        self.aggregator.advance(step)
    }
}

impl core::fmt::Debug for ChunkProgress<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkProgress")
            .field("remaining", &self.remaining.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SharedStatus, SieveConfiguration, SieveRange, StatusInputs};

    #[test]
    fn merges_and_finishes_at_one_hundred() {
        let aggregator = Aggregator::new(100, Flags::COUNT_PRIMES, None);
        aggregator
            .complete_chunk(&PatternCounters::from([10, 1, 0, 0, 0, 0, 0]), 40)
            .unwrap();
        aggregator.merge(&PatternCounters::from([15, 7, 0, 0, 0, 0, 0])).unwrap();
        aggregator.advance(60).unwrap();
        assert_eq!(aggregator.snapshot().unwrap().percent, 100.0);

        let (counters, progress) = aggregator.finish().unwrap();
        assert_eq!(counters.as_array(), &[25, 8, 0, 0, 0, 0, 0]);
        assert_eq!(progress.percent(), 100.0);
        assert_eq!(progress.processed(), 100);
    }

    #[test]
    fn publishes_every_update_and_the_final_state() {
        let status = SharedStatus::new(StatusInputs::new(
            SieveRange::new(0, 10).unwrap(),
            &SieveConfiguration::default(),
        ));
        let aggregator = Aggregator::new(10, Flags::COUNT_PRIMES, Some(&status));
        aggregator
            .complete_chunk(&PatternCounters::from([3, 0, 0, 0, 0, 0, 0]), 5)
            .unwrap();
        assert_eq!(status.latest().unwrap().percent, 50.0);
        assert_eq!(status.latest().unwrap().counters[crate::Pattern::Primes], 3);

        aggregator.finish().unwrap();
        assert_eq!(status.updates().unwrap(), 2);
        assert_eq!(status.latest().unwrap().percent, 100.0);
    }

    #[test]
    fn chunk_progress_never_exceeds_the_chunk() {
        let status = SharedStatus::new(StatusInputs::new(
            SieveRange::new(0, 200).unwrap(),
            &SieveConfiguration::default(),
        ));
        let aggregator = Aggregator::new(200, Flags::COUNT_PRIMES, Some(&status));
        let chunk = aggregator.chunk_progress(100);
        chunk.report(30).unwrap();
        assert_eq!(status.latest().unwrap().percent, 15.0);
        chunk.report(500).unwrap();
        assert_eq!(chunk.remaining(), 0);
        assert_eq!(status.latest().unwrap().percent, 50.0);

        let other = aggregator.chunk_progress(100);
        other.report(40).unwrap();
        aggregator
            .complete_chunk(&PatternCounters::new(), other.remaining())
            .unwrap();
        assert_eq!(status.latest().unwrap().percent, 100.0);
        assert_eq!(status.updates().unwrap(), 4);
    }
}
