//! Mirroring run inputs and live progress into an externally owned channel.
//!
//! A front end (a GUI, a monitoring process, another thread) can own a
//! [`StatusChannel`] that supplies the inputs of a run and observes its
//! progress. The coordinator reads [`StatusInputs`] once and publishes a
//! [`StatusSnapshot`] whenever the engine finishes a segment or a chunk,
//! plus a final one at 100%.

use crate::mutex::Mutex;
use crate::{Flags, PatternCounters, Result, SieveConfiguration, SieveRange};
use core::time::Duration;

/// Run inputs read from a status channel before a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusInputs {
    pub start: u64,
    pub stop: u64,
    pub segment_size_kib: u32,
    pub flags: Flags,
    pub requested_threads: Option<usize>,
}

impl StatusInputs {
    /// Inputs describing `range` sieved under `config`.
    pub fn new(range: SieveRange, config: &SieveConfiguration) -> Self {
        Self {
            start: range.start(),
            stop: range.stop(),
            segment_size_kib: config.segment_size_kib(),
            flags: config.flags(),
            requested_threads: config.requested_threads(),
        }
    }

    /// The validated range.
    ///
    /// # Errors
    /// - [`crate::Error::InvalidRange`] if `stop < start` or a bound is too
    ///   large.
    pub fn range(&self) -> Result<SieveRange> {
        SieveRange::new(self.start, self.stop)
    }

    /// The validated configuration, with every setting not carried by the
    /// channel left at its default.
    ///
    /// # Errors
    /// - [`crate::Error::InvalidConfiguration`] for a bad segment size.
    pub fn configuration(&self) -> Result<SieveConfiguration> {
        SieveConfiguration::builder()
            .flags(self.flags)
            .segment_size_kib(self.segment_size_kib)
            .requested_threads(self.requested_threads)
            .build()
    }
}

/// Progress and partial results of a run in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    pub percent: f64,
    pub counters: PatternCounters,
    pub elapsed: Duration,
}

/// An externally owned channel a run reports into.
///
/// `publish` is called while the run's aggregator lock is held, so
/// snapshots arrive one at a time with non-decreasing `percent`.
/// Implementations should return quickly.
pub trait StatusChannel: Send + Sync {
    /// Inputs for the next run.
    fn inputs(&self) -> StatusInputs;

    /// Receives a snapshot of the run in progress.
    ///
    /// # Errors
    /// Any error aborts the run.
    fn publish(&self, snapshot: &StatusSnapshot) -> Result<()>;
}

/// In-process [`StatusChannel`] that keeps the latest snapshot.
///
/// # Example
/// ```
/// use parsieve::{ParallelSieve, SharedStatus, SieveConfiguration, SieveRange, StatusInputs};
/// use std::sync::Arc;
///
/// let range = SieveRange::new(0, 100).unwrap();
/// let status = Arc::new(SharedStatus::new(StatusInputs::new(
///     range,
///     &SieveConfiguration::default(),
/// )));
///
/// let (sieve, range) = ParallelSieve::from_status_channel(Some(status.clone())).unwrap();
/// sieve.run(range).unwrap();
///
/// let last = status.latest().unwrap();
/// assert_eq!(last.percent, 100.0);
/// assert_eq!(last.counters.as_array()[0], 25);
/// ```
#[derive(Debug)]
pub struct SharedStatus {
    inputs: StatusInputs,
    latest: Mutex<(StatusSnapshot, u64)>,
}

impl SharedStatus {
    pub fn new(inputs: StatusInputs) -> Self {
        Self {
            inputs,
            latest: Mutex::new((StatusSnapshot::default(), 0)),
        }
    }

    /// The most recently published snapshot.
    ///
    /// # Errors
    /// - [`crate::Error::LockPoisoned`] without the `parking-lot` feature,
    ///   if a publisher panicked.
    pub fn latest(&self) -> Result<StatusSnapshot> {
        Ok(crate::mutex::lock(&self.latest)?.0)
    }

    /// How many snapshots have been published.
    pub fn updates(&self) -> Result<u64> {
        Ok(crate::mutex::lock(&self.latest)?.1)
    }
}

impl StatusChannel for SharedStatus {
    fn inputs(&self) -> StatusInputs {
        self.inputs.clone()
    }

    fn publish(&self, snapshot: &StatusSnapshot) -> Result<()> {
        let mut latest = crate::mutex::lock(&self.latest)?;
        latest.0 = *snapshot;
        latest.1 += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn inputs_round_trip_through_configuration() {
        let range = SieveRange::new(10, 1_000).unwrap();
        let config = SieveConfiguration::builder()
            .flags(Flags::COUNT_TWINS)
            .segment_size_kib(16)
            .threads(2)
            .build()
            .unwrap();
        let inputs = StatusInputs::new(range, &config);
        assert_eq!(inputs.range().unwrap(), range);
        assert_eq!(inputs.configuration().unwrap(), config);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut inputs = StatusInputs::new(
            SieveRange::new(0, 10).unwrap(),
            &SieveConfiguration::default(),
        );
        inputs.start = 20;
        assert!(matches!(inputs.range(), Err(Error::InvalidRange { .. })));
        inputs.segment_size_kib = 3;
        assert!(matches!(
            inputs.configuration(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn shared_status_keeps_latest_snapshot() {
        let status = SharedStatus::new(StatusInputs::new(
            SieveRange::new(0, 10).unwrap(),
            &SieveConfiguration::default(),
        ));
        assert_eq!(status.updates().unwrap(), 0);
        let snapshot = StatusSnapshot {
            percent: 50.0,
            counters: PatternCounters::from([2, 0, 0, 0, 0, 0, 0]),
            elapsed: Duration::from_millis(1),
        };
        status.publish(&snapshot).unwrap();
        assert_eq!(status.latest().unwrap(), snapshot);
        assert_eq!(status.updates().unwrap(), 1);
    }
}
