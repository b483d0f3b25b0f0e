//! Modulo 30 wheel layout shared by the engine and the chunk planner.
//!
//! One wheel byte describes the 8 numbers coprime to 30 in
//! `[30k + 7, 30k + 31]`; bit `i` is set when `30k + BIT_VALUES[i]` is prime.
//! Every k-tuplet with smallest member >= 7 fits inside a single byte, which
//! is why chunk boundaries are placed at `30k + 2`: the gap between two bytes.

use crate::Pattern;

/// Numbers per wheel rotation (2 * 3 * 5).
pub const WHEEL_PERIOD: u64 = 30;

/// Residue modulo [`WHEEL_PERIOD`] of every interior chunk boundary.
///
/// `30k + 2` lies strictly between byte `k - 1` (ending at `30k + 1`) and
/// byte `k` (starting at `30k + 7`), and is even, so it is never prime.
pub const WHEEL_BOUNDARY_RESIDUE: u64 = 2;

/// Offsets of the 8 bits of a wheel byte.
pub const BIT_VALUES: [u64; 8] = [7, 11, 13, 17, 19, 23, 29, 31];

/// Wheel byte index of `n`, for `n >= 7`.
#[inline]
pub const fn byte_index(n: u64) -> u64 {
    (n - WHEEL_BOUNDARY_RESIDUE) / WHEEL_PERIOD
}

/// Bitmasks of every k-tuplet shape inside one wheel byte, twins first.
pub const KTUPLET_BITMASKS: [&[u8]; 6] = [
    &[0x06, 0x18, 0xc0],       // twins: (11,13) (17,19) (29,31)
    &[0x07, 0x0e, 0x1c, 0x38], // triplets
    &[0x1e],                   // quadruplets: (11,13,17,19)
    &[0x1f, 0x3e],             // quintuplets
    &[0x3f],                   // sextuplets: (7,11,13,17,19,23)
    &[0xfe],                   // septuplets: (11,13,17,19,23,29,31)
];

/// Bitmasks for `pattern`; empty for [`Pattern::Primes`].
pub const fn bitmasks(pattern: Pattern) -> &'static [u8] {
    match pattern {
        Pattern::Primes => &[],
        other => KTUPLET_BITMASKS[other as usize - 1],
    }
}

/// Per-byte k-tuplet counts: `KTUPLET_COUNTS[pattern - 1][byte]`.
pub(crate) static KTUPLET_COUNTS: [[u8; 256]; 6] = build_ktuplet_counts();

const fn build_ktuplet_counts() -> [[u8; 256]; 6] {
    let mut table = [[0u8; 256]; 6];
    let mut i = 0;
    while i < 6 {
        let masks = KTUPLET_BITMASKS[i];
        let mut byte = 0;
        while byte < 256 {
            let mut count = 0;
            let mut m = 0;
            while m < masks.len() {
                if byte as u8 & masks[m] == masks[m] {
                    count += 1;
                }
                m += 1;
            }
            table[i][byte] = count;
            byte += 1;
        }
        i += 1;
    }
    table
}

/// Patterns containing 2, 3 or 5, which the wheel cannot represent.
///
/// Each entry is counted when `start <= members[0]` and
/// `stop >= members[last]`.
pub(crate) const SMALL_PATTERNS: [(Pattern, &[u64]); 8] = [
    (Pattern::Primes, &[2]),
    (Pattern::Primes, &[3]),
    (Pattern::Primes, &[5]),
    (Pattern::Twins, &[3, 5]),
    (Pattern::Twins, &[5, 7]),
    (Pattern::Triplets, &[5, 7, 11]),
    (Pattern::Quadruplets, &[5, 7, 11, 13]),
    (Pattern::Quintuplets, &[5, 7, 11, 13, 17]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_describe_admissible_spacings() {
        // Every shape already occurs in the first byte, 7..=31.
        let is_prime = |n: u64| n > 1 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0);
        for pattern in &Pattern::ALL[1..] {
            for &mask in bitmasks(*pattern) {
                assert_eq!(mask.count_ones() as usize, pattern.size());
                let all_prime = (0..8)
                    .filter(|b| mask & (1 << b) != 0)
                    .all(|b| is_prime(BIT_VALUES[b]));
                assert!(all_prime, "{pattern:?} {mask:#04x}");
            }
        }
    }

    #[test]
    fn lookup_counts_all_shapes_in_a_full_byte() {
        assert_eq!(KTUPLET_COUNTS[0][0xff], 3);
        assert_eq!(KTUPLET_COUNTS[1][0xff], 4);
        assert_eq!(KTUPLET_COUNTS[5][0xff], 1);
        assert_eq!(KTUPLET_COUNTS[5][0x7f], 0);
        assert_eq!(KTUPLET_COUNTS[0][0x00], 0);
    }

    #[test]
    fn boundary_residue_sits_between_bytes() {
        for k in 1..100 {
            let boundary = WHEEL_PERIOD * k + WHEEL_BOUNDARY_RESIDUE;
            assert_eq!(byte_index(boundary - 1), k - 1);
            assert_eq!(byte_index(boundary + 5), k);
        }
    }
}
