use crate::{Error, Result};

/// Exclusive upper limit for both bounds of a [`SieveRange`].
///
/// The engine rounds chunk bounds up to whole wheel rotations and walks
/// multiples of sieving primes past `stop`, so the top `(2^32 - 1) * 10`
/// values of `u64` are reserved as head-room.
pub const MAX_STOP: u64 = u64::MAX - (u32::MAX as u64) * 10;

/// An inclusive interval `[start, stop]` to sieve.
///
/// A `SieveRange` can only be obtained through [`SieveRange::new`], which
/// enforces `start <= stop < MAX_STOP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SieveRange {
    start: u64,
    stop: u64,
}

impl SieveRange {
    /// Validates and creates a new range.
    ///
    /// # Errors
    /// - [`Error::InvalidRange`] if `stop < start` or either bound is
    ///   `>= MAX_STOP`.
    ///
    /// # Example
    /// ```
    /// use parsieve::SieveRange;
    ///
    /// let range = SieveRange::new(2, 100).unwrap();
    /// assert_eq!(range.len(), 98);
    /// assert!(SieveRange::new(100, 2).is_err());
    /// ```
    pub fn new(start: u64, stop: u64) -> Result<Self> {
        if stop < start {
            return Err(Error::InvalidRange {
                start,
                stop,
                reason: "STOP must be >= START",
            });
        }
        if start >= MAX_STOP || stop >= MAX_STOP {
            return Err(Error::InvalidRange {
                start,
                stop,
                reason: "START and STOP must be < (2^64-1) - (2^32-1) * 10",
            });
        }
        Ok(Self { start, stop })
    }

    /// Creates the range `[start, start + offset]`.
    ///
    /// # Errors
    /// - [`Error::InvalidRange`] if the sum overflows or exceeds `MAX_STOP`.
    pub fn with_offset(start: u64, offset: u64) -> Result<Self> {
        match start.checked_add(offset) {
            Some(stop) => Self::new(start, stop),
            None => Err(Error::InvalidRange {
                start,
                stop: u64::MAX,
                reason: "START + OFFSET overflows",
            }),
        }
    }

    pub const fn start(&self) -> u64 {
        self.start
    }

    pub const fn stop(&self) -> u64 {
        self.stop
    }

    /// The sieve interval, `stop - start`.
    ///
    /// This is the quantity thread planning and progress are measured
    /// against. A single-value range has length zero.
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> u64 {
        self.stop - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        let err = SieveRange::new(10, 9).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidRange {
                start: 10,
                stop: 9,
                ..
            }
        ));
    }

    #[test]
    fn rejects_bounds_past_engine_limit() {
        assert!(SieveRange::new(0, MAX_STOP).is_err());
        assert!(SieveRange::new(0, MAX_STOP - 1).is_ok());
    }

    #[test]
    fn single_value_range_has_zero_length() {
        let range = SieveRange::new(7, 7).unwrap();
        assert_eq!(range.len(), 0);
    }

    #[test]
    fn offset_range_matches_explicit_bounds() {
        let range = SieveRange::with_offset(1_000, 500).unwrap();
        assert_eq!(range, SieveRange::new(1_000, 1_500).unwrap());
        assert!(SieveRange::with_offset(u64::MAX, 1).is_err());
    }
}
