//! Run configuration for parallel sieving.
//!
//! A [`SieveConfiguration`] is built once, validated, and then treated as an
//! immutable value: the planner reads it, every engine instance receives a
//! shared reference to it, and nothing mutates it during a run.

use crate::{Error, Pattern, Result};
use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Default engine segment size in KiB.
pub const DEFAULT_SEGMENT_SIZE_KIB: u32 = 64;

/// Largest accepted engine segment size in KiB.
pub const MAX_SEGMENT_SIZE_KIB: u32 = 8192;

/// Default minimum interval a worker must sieve before splitting pays off.
///
/// Below this many numbers per chunk the per-engine setup cost (generating
/// sieving primes, allocating the segment) dominates and a single thread is
/// faster.
pub const MIN_THREAD_INTERVAL: u64 = 100_000_000;

/// Smallest accepted `min_thread_interval`.
pub const MIN_THREAD_INTERVAL_FLOOR: u64 = 100;

/// Behaviour flags: which patterns to count, which to print, and whether to
/// report status.
///
/// Bit positions match `COUNT_*` = `1 << pattern` and
/// `PRINT_*` = `1 << (7 + pattern)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Self = Self(0);
    pub const COUNT_PRIMES: Self = Self(1 << 0);
    pub const COUNT_TWINS: Self = Self(1 << 1);
    pub const COUNT_TRIPLETS: Self = Self(1 << 2);
    pub const COUNT_QUADRUPLETS: Self = Self(1 << 3);
    pub const COUNT_QUINTUPLETS: Self = Self(1 << 4);
    pub const COUNT_SEXTUPLETS: Self = Self(1 << 5);
    pub const COUNT_SEPTUPLETS: Self = Self(1 << 6);
    pub const PRINT_PRIMES: Self = Self(1 << 7);
    pub const PRINT_TWINS: Self = Self(1 << 8);
    pub const PRINT_TRIPLETS: Self = Self(1 << 9);
    pub const PRINT_QUADRUPLETS: Self = Self(1 << 10);
    pub const PRINT_QUINTUPLETS: Self = Self(1 << 11);
    pub const PRINT_SEXTUPLETS: Self = Self(1 << 12);
    pub const PRINT_SEPTUPLETS: Self = Self(1 << 13);
    pub const PRINT_STATUS: Self = Self(1 << 14);

    /// Every `COUNT_*` flag.
    pub const COUNT_FLAGS: Self = Self(0x7f);
    /// Every k-tuplet `COUNT_*` flag (twins and up).
    pub const COUNT_KTUPLETS: Self = Self(0x7e);
    /// Every `PRINT_*` pattern flag. Any of these demands ordered output.
    pub const PRINT_FLAGS: Self = Self(0x7f << 7);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn count(pattern: Pattern) -> Self {
        Self(1 << pattern as u32)
    }

    pub const fn print(pattern: Pattern) -> Self {
        Self(1 << (7 + pattern as u32))
    }

    pub const fn counts(self, pattern: Pattern) -> bool {
        self.intersects(Self::count(pattern))
    }

    pub const fn prints(self, pattern: Pattern) -> bool {
        self.intersects(Self::print(pattern))
    }

    /// `true` if primes or k-tuplets must be emitted in increasing order.
    pub const fn requires_ordered_output(self) -> bool {
        self.intersects(Self::PRINT_FLAGS)
    }

    /// The pattern selected for printing, smallest first.
    ///
    /// Only one pattern is printed per run; if several `PRINT_*` flags are
    /// set the smallest wins.
    pub fn printed_pattern(self) -> Option<Pattern> {
        Pattern::ALL.into_iter().find(|&p| self.prints(p))
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::COUNT_PRIMES
    }
}

impl core::fmt::Debug for Flags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Flags({:#06x})", self.0)
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Immutable settings for one sieve run.
///
/// Build with [`SieveConfiguration::builder`]; invalid segment sizes and
/// thread intervals are rejected at build time. An out-of-range thread
/// request is *not* an error: the planner replaces it with the ideal count.
///
/// # Example
/// ```
/// use parsieve::{Flags, SieveConfiguration};
///
/// let config = SieveConfiguration::builder()
///     .flags(Flags::COUNT_PRIMES | Flags::COUNT_TWINS)
///     .segment_size_kib(32)
///     .threads(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.segment_size_kib(), 32);
/// assert_eq!(config.requested_threads(), Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SieveConfiguration {
    flags: Flags,
    segment_size_kib: u32,
    requested_threads: Option<usize>,
    min_thread_interval: u64,
}

impl SieveConfiguration {
    pub fn builder() -> SieveConfigurationBuilder {
        SieveConfigurationBuilder::default()
    }

    pub const fn flags(&self) -> Flags {
        self.flags
    }

    pub const fn segment_size_kib(&self) -> u32 {
        self.segment_size_kib
    }

    /// Segment size in bytes; each byte covers one 30-number wheel rotation.
    pub const fn segment_size_bytes(&self) -> usize {
        self.segment_size_kib as usize * 1024
    }

    pub const fn requested_threads(&self) -> Option<usize> {
        self.requested_threads
    }

    pub const fn min_thread_interval(&self) -> u64 {
        self.min_thread_interval
    }

    /// Returns a copy with a different thread request.
    pub fn with_requested_threads(&self, threads: Option<usize>) -> Self {
        Self {
            requested_threads: threads,
            ..self.clone()
        }
    }
}

impl Default for SieveConfiguration {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            segment_size_kib: DEFAULT_SEGMENT_SIZE_KIB,
            requested_threads: None,
            min_thread_interval: MIN_THREAD_INTERVAL,
        }
    }
}

/// Builder for [`SieveConfiguration`].
#[derive(Debug, Clone)]
pub struct SieveConfigurationBuilder {
    inner: SieveConfiguration,
}

impl Default for SieveConfigurationBuilder {
    fn default() -> Self {
        Self {
            inner: SieveConfiguration::default(),
        }
    }
}

impl SieveConfigurationBuilder {
    #[must_use]
    pub const fn flags(mut self, flags: Flags) -> Self {
        self.inner.flags = flags;
        self
    }

    #[must_use]
    pub const fn segment_size_kib(mut self, kib: u32) -> Self {
        self.inner.segment_size_kib = kib;
        self
    }

    #[must_use]
    pub const fn threads(mut self, threads: usize) -> Self {
        self.inner.requested_threads = Some(threads);
        self
    }

    #[must_use]
    pub const fn requested_threads(mut self, threads: Option<usize>) -> Self {
        self.inner.requested_threads = threads;
        self
    }

    #[must_use]
    pub const fn min_thread_interval(mut self, interval: u64) -> Self {
        self.inner.min_thread_interval = interval;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    /// - [`Error::InvalidConfiguration`] if the segment size is not a power of
    ///   two in `1..=8192` KiB, or `min_thread_interval < 100`.
    pub fn build(self) -> Result<SieveConfiguration> {
        let kib = self.inner.segment_size_kib;
        if kib == 0 || kib > MAX_SEGMENT_SIZE_KIB {
            return Err(Error::InvalidConfiguration {
                reason: format!(
                    "segment size must be >= 1 and <= {MAX_SEGMENT_SIZE_KIB} KiB, got {kib}"
                ),
            });
        }
        if !kib.is_power_of_two() {
            return Err(Error::InvalidConfiguration {
                reason: format!("segment size must be a power of 2, got {kib}"),
            });
        }
        if self.inner.min_thread_interval < MIN_THREAD_INTERVAL_FLOOR {
            return Err(Error::InvalidConfiguration {
                reason: format!(
                    "minimum thread interval must be >= {MIN_THREAD_INTERVAL_FLOOR}, got {}",
                    self.inner.min_thread_interval
                ),
            });
        }
        Ok(self.inner)
    }
}
