//! Splitting a sieve range into wheel-aligned chunks.
//!
//! Interior boundaries are snapped up to the next `30k + 2` so that no wheel
//! byte, and therefore no k-tuplet, straddles two chunks. Neighbouring chunks
//! share their boundary value: it is even and at least 32, so it is never
//! counted twice.

use crate::{SieveRange, WHEEL_BOUNDARY_RESIDUE, WHEEL_PERIOD};

/// One sub-range of a [`ChunkPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chunk {
    pub index: usize,
    pub start: u64,
    pub stop: u64,
}

impl Chunk {
    /// Amount of the sieve interval this chunk accounts for.
    pub const fn len(&self) -> u64 {
        self.stop - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.stop == self.start
    }
}

/// First value `≡ 2 (mod 30)` of the wheel rotation after the one holding
/// `n`, i.e. `n + 32 - n % 30`.
///
/// The result is always `> n` and `>= 32`.
///
/// # Example
/// ```
/// use parsieve::snap_to_wheel;
///
/// assert_eq!(snap_to_wheel(0), 32);
/// assert_eq!(snap_to_wheel(100), 122);
/// assert_eq!(snap_to_wheel(119), 122);
/// assert_eq!(snap_to_wheel(120), 152);
/// ```
pub const fn snap_to_wheel(n: u64) -> u64 {
    n - n % WHEEL_PERIOD + WHEEL_PERIOD + WHEEL_BOUNDARY_RESIDUE
}

/// Ordered, contiguous, wheel-aligned chunks covering a [`SieveRange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Splits `range` into chunks of roughly `interval` numbers.
    ///
    /// `ceil(len / interval)` raw boundaries are computed at
    /// `start + i * interval` and snapped with [`snap_to_wheel`]. Snapped
    /// boundaries that reach `stop`, or that fail to advance past the
    /// previous boundary, are dropped, so every chunk is non-empty and the
    /// last one ends exactly at `stop`. An `interval` of zero yields a single
    /// chunk.
    pub fn new(range: SieveRange, interval: u64) -> Self {
        let (start, stop) = (range.start(), range.stop());
        let len = range.len();
        let count = if interval == 0 {
            1
        } else {
            len.div_ceil(interval).max(1)
        };

        let mut chunks = Vec::with_capacity(count.min(1 << 16) as usize);
        let mut lower = start;
        let mut i = 1;
        while i < count {
            let Some(raw) = interval.checked_mul(i).and_then(|o| start.checked_add(o)) else {
                break;
            };
            let boundary = snap_to_wheel(raw);
            if boundary >= stop {
                break;
            }
            if boundary > lower {
                chunks.push(Chunk {
                    index: chunks.len(),
                    start: lower,
                    stop: boundary,
                });
                lower = boundary;
            }
            // Every raw value below `boundary - 2` snaps to `boundary` or less.
            let next = (boundary - WHEEL_BOUNDARY_RESIDUE - start).div_ceil(interval);
            i = next.max(i + 1);
        }
        chunks.push(Chunk {
            index: chunks.len(),
            start: lower,
            stop,
        });
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Always `false`: a plan has at least one chunk.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Boundaries shared by two neighbouring chunks.
    pub fn interior_boundaries(&self) -> impl Iterator<Item = u64> + '_ {
        self.chunks.windows(2).map(|w| w[0].stop)
    }
}

impl<'a> IntoIterator for &'a ChunkPlan {
    type Item = &'a Chunk;
    type IntoIter = core::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}
