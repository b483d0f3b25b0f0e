use crate::Result;
use core::time::Duration;

/// Receives progress from an engine while it sieves one chunk.
///
/// Engines call [`report`](Self::report) after each segment with the number
/// of values that segment covered. Reports past the end of the chunk are
/// ignored by the coordinator, so an engine may round up.
pub trait ProgressReporter {
    /// `processed` more numbers of the current chunk have been sieved.
    ///
    /// # Errors
    /// The engine must stop and return the error; it aborts the run.
    fn report(&self, processed: u64) -> Result<()>;
}

/// Discards progress.
impl ProgressReporter for () {
    fn report(&self, _processed: u64) -> Result<()> {
        Ok(())
    }
}

/// Live progress of one run.
///
/// `processed` only grows, so `percent` never decreases. A run that
/// completes always ends at exactly `100.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressState {
    processed: u64,
    total: u64,
    percent: f64,
    elapsed: Duration,
}

impl ProgressState {
    /// Fresh progress for an interval of `total` numbers.
    pub const fn new(total: u64) -> Self {
        Self {
            processed: 0,
            total,
            percent: 0.0,
            elapsed: Duration::ZERO,
        }
    }

    pub const fn processed(&self) -> u64 {
        self.processed
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    pub const fn percent(&self) -> f64 {
        self.percent
    }

    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Adds `amount` to the processed total and recomputes the percentage,
    /// clamped to `[0, 100]`.
    pub fn advance(&mut self, amount: u64) {
        self.processed = self.processed.saturating_add(amount);
        let percent = if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        };
        // Float rounding must not move the needle backwards.
        self.percent = percent.clamp(self.percent, 100.0);
    }

    /// Marks the run complete.
    pub fn finish(&mut self, elapsed: Duration) {
        self.processed = self.processed.max(self.total);
        self.percent = 100.0;
        self.elapsed = elapsed;
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped_and_monotonic() {
        let mut progress = ProgressState::new(1_000);
        progress.advance(250);
        assert_eq!(progress.percent(), 25.0);
        progress.advance(0);
        assert_eq!(progress.percent(), 25.0);
        progress.advance(10_000);
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn zero_length_interval_completes_on_first_advance() {
        let mut progress = ProgressState::new(0);
        assert_eq!(progress.percent(), 0.0);
        progress.advance(0);
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn finish_pins_exactly_one_hundred() {
        let mut progress = ProgressState::new(3);
        progress.advance(1);
        progress.finish(Duration::from_millis(5));
        assert_eq!(progress.percent(), 100.0);
        assert_eq!(progress.processed(), 3);
        assert_eq!(progress.elapsed(), Duration::from_millis(5));
    }
}
