use core::ops::{Add, AddAssign, Index, IndexMut};

/// Number of patterns tracked by [`PatternCounters`].
pub const PATTERN_COUNT: usize = 7;

/// A prime constellation counted by the sieve.
///
/// The discriminant is the pattern's position in [`PatternCounters`] and the
/// bit offset of its `COUNT_*` / `PRINT_*` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Pattern {
    Primes = 0,
    Twins = 1,
    Triplets = 2,
    Quadruplets = 3,
    Quintuplets = 4,
    Sextuplets = 5,
    Septuplets = 6,
}

impl Pattern {
    /// All patterns in counter order.
    pub const ALL: [Self; PATTERN_COUNT] = [
        Self::Primes,
        Self::Twins,
        Self::Triplets,
        Self::Quadruplets,
        Self::Quintuplets,
        Self::Sextuplets,
        Self::Septuplets,
    ];

    /// Returns the pattern at `index`, or `None` if `index >= 7`.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < PATTERN_COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of primes in one occurrence of the pattern.
    pub const fn size(self) -> usize {
        self as usize + 1
    }

    /// Human readable plural name, e.g. `"Twin primes"`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primes => "Prime numbers",
            Self::Twins => "Twin primes",
            Self::Triplets => "Prime triplets",
            Self::Quadruplets => "Prime quadruplets",
            Self::Quintuplets => "Prime quintuplets",
            Self::Sextuplets => "Prime sextuplets",
            Self::Septuplets => "Prime septuplets",
        }
    }
}

/// Per-pattern totals: primes, twins, triplets, ..., septuplets.
///
/// Merging is plain addition, so totals are independent of the order in
/// which chunks complete.
///
/// # Example
/// ```
/// use parsieve::{Pattern, PatternCounters};
///
/// let mut total = PatternCounters::default();
/// total += PatternCounters::from([4, 2, 0, 0, 0, 0, 0]);
/// total += PatternCounters::from([21, 7, 5, 2, 1, 0, 0]);
/// assert_eq!(total[Pattern::Primes], 25);
/// assert_eq!(total.get(Pattern::Twins), 9);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternCounters {
    counts: [u64; PATTERN_COUNT],
}

impl PatternCounters {
    pub const fn new() -> Self {
        Self {
            counts: [0; PATTERN_COUNT],
        }
    }

    pub const fn get(&self, pattern: Pattern) -> u64 {
        self.counts[pattern as usize]
    }

    /// Counter by raw index, `None` if `index >= 7`.
    pub fn count(&self, index: usize) -> Option<u64> {
        self.counts.get(index).copied()
    }

    pub const fn as_array(&self) -> &[u64; PATTERN_COUNT] {
        &self.counts
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pattern, u64)> + '_ {
        Pattern::ALL.iter().map(|&p| (p, self.counts[p as usize]))
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (dst, src) in self.counts.iter_mut().zip(other.counts.iter()) {
            *dst += *src;
        }
    }
}

impl From<[u64; PATTERN_COUNT]> for PatternCounters {
    fn from(counts: [u64; PATTERN_COUNT]) -> Self {
        Self { counts }
    }
}

impl Index<Pattern> for PatternCounters {
    type Output = u64;

    fn index(&self, pattern: Pattern) -> &u64 {
        &self.counts[pattern as usize]
    }
}

impl IndexMut<Pattern> for PatternCounters {
    fn index_mut(&mut self, pattern: Pattern) -> &mut u64 {
        &mut self.counts[pattern as usize]
    }
}

impl AddAssign for PatternCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl Add for PatternCounters {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.merge(&rhs);
        self
    }
}
