//! One-call helpers over [`ParallelSieve`] with the reference engine.
//!
//! Counting helpers use every hardware thread unless told otherwise; the
//! enumeration and printing helpers run on a single thread so results arrive
//! in increasing order.

use crate::mutex::Mutex;
use crate::{
    Error, Flags, Indexed, MAX_STOP, ParallelSieve, Pattern, PrimeCallback, PrintTarget, Result,
    SegmentedSieve, SieveConfiguration, SieveRange,
};
use portable_atomic::{AtomicBool, Ordering};

/// Primes left to find before an nth-prime search switches from counting
/// to enumerating.
const NTH_PRIME_BATCH: u64 = 1_000_000;

/// Largest `stop` accepted by every function of this crate.
///
/// # Example
/// ```
/// use parsieve::{SieveRange, max_stop};
///
/// assert!(SieveRange::new(0, max_stop()).is_ok());
/// assert!(SieveRange::new(0, max_stop() + 1).is_err());
/// ```
pub const fn max_stop() -> u64 {
    MAX_STOP - 1
}

fn count(start: u64, stop: u64, pattern: Pattern, threads: Option<usize>) -> Result<u64> {
    let config = SieveConfiguration::builder()
        .flags(Flags::count(pattern))
        .requested_threads(threads)
        .build()?;
    let outcome = ParallelSieve::new(config).run(SieveRange::new(start, stop)?)?;
    Ok(outcome.counters[pattern])
}

/// Counts the primes in `[start, stop]`.
///
/// # Errors
/// - [`crate::Error::InvalidRange`] if `stop < start` or a bound is too
///   large.
///
/// # Example
/// ```
/// assert_eq!(parsieve::count_primes(0, 1_000).unwrap(), 168);
/// assert_eq!(parsieve::count_twins(0, 1_000).unwrap(), 35);
/// ```
pub fn count_primes(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Primes, None)
}

/// Counts the twin primes in `[start, stop]`.
pub fn count_twins(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Twins, None)
}

/// Counts the prime triplets in `[start, stop]`.
pub fn count_triplets(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Triplets, None)
}

/// Counts the prime quadruplets in `[start, stop]`.
pub fn count_quadruplets(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Quadruplets, None)
}

/// Counts the prime quintuplets in `[start, stop]`.
pub fn count_quintuplets(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Quintuplets, None)
}

/// Counts the prime sextuplets in `[start, stop]`.
pub fn count_sextuplets(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Sextuplets, None)
}

/// Counts the prime septuplets in `[start, stop]`.
pub fn count_septuplets(start: u64, stop: u64) -> Result<u64> {
    count(start, stop, Pattern::Septuplets, None)
}

/// Counts the primes in `[start, stop]` with `threads` workers.
///
/// A thread count outside `[1, max_threads()]` is replaced by the ideal
/// count for the range.
pub fn parallel_count_primes(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Primes, Some(threads))
}

/// Counts the twin primes in `[start, stop]` with `threads` workers.
pub fn parallel_count_twins(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Twins, Some(threads))
}

/// Counts the prime triplets in `[start, stop]` with `threads` workers.
pub fn parallel_count_triplets(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Triplets, Some(threads))
}

/// Counts the prime quadruplets in `[start, stop]` with `threads` workers.
pub fn parallel_count_quadruplets(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Quadruplets, Some(threads))
}

/// Counts the prime quintuplets in `[start, stop]` with `threads` workers.
pub fn parallel_count_quintuplets(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Quintuplets, Some(threads))
}

/// Counts the prime sextuplets in `[start, stop]` with `threads` workers.
pub fn parallel_count_sextuplets(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Sextuplets, Some(threads))
}

/// Counts the prime septuplets in `[start, stop]` with `threads` workers.
pub fn parallel_count_septuplets(start: u64, stop: u64, threads: usize) -> Result<u64> {
    count(start, stop, Pattern::Septuplets, Some(threads))
}

fn print(start: u64, stop: u64, pattern: Pattern, output: PrintTarget) -> Result<()> {
    let config = SieveConfiguration::builder().flags(Flags::print(pattern)).build()?;
    ParallelSieve::new(config)
        .with_engine(SegmentedSieve::with_output(output))
        .run(SieveRange::new(start, stop)?)?;
    Ok(())
}

/// Prints the primes in `[start, stop]` to stdout, one per line.
pub fn print_primes(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Primes, PrintTarget::Stdout)
}

/// Prints the twin primes in `[start, stop]` to stdout, e.g. `(11, 13)`.
pub fn print_twins(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Twins, PrintTarget::Stdout)
}

/// Prints the prime triplets in `[start, stop]` to stdout.
pub fn print_triplets(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Triplets, PrintTarget::Stdout)
}

/// Prints the prime quadruplets in `[start, stop]` to stdout.
pub fn print_quadruplets(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Quadruplets, PrintTarget::Stdout)
}

/// Prints the prime quintuplets in `[start, stop]` to stdout.
pub fn print_quintuplets(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Quintuplets, PrintTarget::Stdout)
}

/// Prints the prime sextuplets in `[start, stop]` to stdout.
pub fn print_sextuplets(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Sextuplets, PrintTarget::Stdout)
}

/// Prints the prime septuplets in `[start, stop]` to stdout.
pub fn print_septuplets(start: u64, stop: u64) -> Result<()> {
    print(start, stop, Pattern::Septuplets, PrintTarget::Stdout)
}

/// Calls `callback` with every prime in `[start, stop]`, in increasing
/// order.
pub fn for_each_prime(start: u64, stop: u64, callback: &dyn PrimeCallback) -> Result<()> {
    let config = SieveConfiguration::builder().flags(Flags::NONE).build()?;
    ParallelSieve::new(config)
        .with_max_threads(1)
        .run_with_callback(SieveRange::new(start, stop)?, callback)?;
    Ok(())
}

/// Calls `callback(prime, chunk_index)` with every prime in `[start, stop]`
/// from `threads` workers.
///
/// Calls from different chunks interleave; within one chunk primes arrive
/// in increasing order. A thread count outside `[1, max_threads()]` is
/// replaced by the ideal count for the range.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let found = AtomicU64::new(0);
/// parsieve::parallel_callback_primes(0, 100_000, |_, _| {
///     found.fetch_add(1, Ordering::Relaxed);
/// }, 4)
/// .unwrap();
/// assert_eq!(found.into_inner(), 9_592);
/// ```
pub fn parallel_callback_primes<F>(start: u64, stop: u64, callback: F, threads: usize) -> Result<()>
where
    F: Fn(u64, usize) + Sync,
{
    let config = SieveConfiguration::builder()
        .flags(Flags::NONE)
        .requested_threads(Some(threads))
        .build()?;
    ParallelSieve::new(config)
        .run_with_callback(SieveRange::new(start, stop)?, &Indexed(callback))?;
    Ok(())
}

/// Appends the primes in `[start, stop]` to `primes`, in increasing order.
fn collect_primes(start: u64, stop: u64, primes: &Mutex<Vec<u64>>) -> Result<()> {
    let poisoned = AtomicBool::new(false);
    let push = |prime: u64| match crate::mutex::lock(primes) {
        Ok(mut primes) => primes.push(prime),
        Err(_) => poisoned.store(true, Ordering::Relaxed),
    };
    for_each_prime(start, stop, &push)?;
    if poisoned.load(Ordering::Relaxed) {
        return Err(Error::LockPoisoned);
    }
    Ok(())
}

fn into_primes(primes: Mutex<Vec<u64>>) -> Result<Vec<u64>> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(primes.into_inner())
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        primes.into_inner().map_err(|_| Error::LockPoisoned)
    }
}

/// Collects the primes in `[start, stop]` into a sorted vector.
///
/// # Errors
/// - [`crate::Error::InvalidRange`] if `stop < start` or a bound is too
///   large.
/// - [`crate::Error::LockPoisoned`] if the collecting lock was poisoned.
///
/// # Example
/// ```
/// let primes = parsieve::generate_primes(10, 30).unwrap();
/// assert_eq!(primes, [11, 13, 17, 19, 23, 29]);
/// ```
pub fn generate_primes(start: u64, stop: u64) -> Result<Vec<u64>> {
    let primes = Mutex::new(Vec::new());
    collect_primes(start, stop, &primes)?;
    into_primes(primes)
}

/// Collects the first `n` primes `>= start`.
///
/// # Errors
/// - [`crate::Error::InvalidRange`] if fewer than `n` primes lie in
///   `[start, max_stop()]`.
///
/// # Example
/// ```
/// assert_eq!(parsieve::generate_n_primes(4, 20).unwrap(), [23, 29, 31, 37]);
/// ```
pub fn generate_n_primes(n: usize, start: u64) -> Result<Vec<u64>> {
    let primes = Mutex::new(Vec::new());
    let mut low = start;
    loop {
        let found = crate::mutex::lock(&primes)?.len();
        if found >= n {
            break;
        }
        let high = window_end(low, search_window(low, (n - found) as u64))?;
        collect_primes(low, high, &primes)?;
        low = high + 1;
    }
    let mut primes = into_primes(primes)?;
    primes.truncate(n);
    Ok(primes)
}

/// Finds the `n`th prime `>= start`, counting from one.
///
/// # Errors
/// - [`crate::Error::InvalidConfiguration`] if `n` is zero.
/// - [`crate::Error::InvalidRange`] if the prime would exceed
///   [`max_stop()`].
///
/// # Example
/// ```
/// assert_eq!(parsieve::nth_prime(1, 0).unwrap(), 2);
/// assert_eq!(parsieve::nth_prime(10_000, 0).unwrap(), 104_729);
/// ```
pub fn nth_prime(n: u64, start: u64) -> Result<u64> {
    find_nth_prime(n, start, None)
}

/// Like [`nth_prime`], counting with `threads` workers.
pub fn parallel_nth_prime(n: u64, start: u64, threads: usize) -> Result<u64> {
    find_nth_prime(n, start, Some(threads))
}

/// Counts whole windows while many primes remain, then enumerates the
/// last window.
fn find_nth_prime(n: u64, start: u64, threads: Option<usize>) -> Result<u64> {
    if n == 0 {
        return Err(Error::InvalidConfiguration {
            reason: "n must be >= 1".to_string(),
        });
    }

    let mut low = start;
    let mut remaining = n;
    while remaining > NTH_PRIME_BATCH {
        let target = remaining - NTH_PRIME_BATCH / 2;
        let mut high = window_end(low, prime_distance(low, target))?;
        let mut found = count(low, high, Pattern::Primes, threads)?;
        while found >= remaining {
            high = low + (high - low) / 2;
            found = count(low, high, Pattern::Primes, threads)?;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(low, high, found, remaining, "nth prime window counted");
        remaining -= found;
        low = high + 1;
    }

    loop {
        let high = window_end(low, search_window(low, remaining))?;
        let primes = generate_primes(low, high)?;
        if let Some(&prime) = primes.get((remaining - 1) as usize) {
            return Ok(prime);
        }
        remaining -= primes.len() as u64;
        low = high + 1;
    }
}

/// Estimated distance spanned by `n` primes starting at `start`, from the
/// average prime gap `ln(x)`.
fn prime_distance(start: u64, n: u64) -> u64 {
    let n = n as f64;
    let x = (start as f64).max(n * n.ln()).max(10.0);
    (n * x.ln()) as u64
}

/// A window that usually holds `n` primes past `start`.
fn search_window(start: u64, n: u64) -> u64 {
    let distance = prime_distance(start, n);
    distance.saturating_add(distance / 5).saturating_add(10_000)
}

fn window_end(low: u64, distance: u64) -> Result<u64> {
    let last = max_stop();
    if low > last {
        return Err(Error::InvalidRange {
            start: low,
            stop: last,
            reason: "search passed max_stop()",
        });
    }
    Ok(low.saturating_add(distance).min(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const PATTERNS_BELOW_100K: [u64; 7] = [9592, 1224, 507, 38, 21, 5, 1];

    #[test]
    fn counts_each_pattern_below_one_hundred_thousand() {
        let counts = [
            count_primes(0, 100_000).unwrap(),
            count_twins(0, 100_000).unwrap(),
            count_triplets(0, 100_000).unwrap(),
            count_quadruplets(0, 100_000).unwrap(),
            count_quintuplets(0, 100_000).unwrap(),
            count_sextuplets(0, 100_000).unwrap(),
            count_septuplets(0, 100_000).unwrap(),
        ];
        assert_eq!(counts, PATTERNS_BELOW_100K);
    }

    #[test]
    fn parallel_counts_each_pattern() {
        let counts = [
            parallel_count_primes(0, 100_000, 2).unwrap(),
            parallel_count_twins(0, 100_000, 2).unwrap(),
            parallel_count_triplets(0, 100_000, 2).unwrap(),
            parallel_count_quadruplets(0, 100_000, 2).unwrap(),
            parallel_count_quintuplets(0, 100_000, 2).unwrap(),
            parallel_count_sextuplets(0, 100_000, 2).unwrap(),
            parallel_count_septuplets(0, 100_000, 2).unwrap(),
        ];
        assert_eq!(counts, PATTERNS_BELOW_100K);
    }

    #[test]
    fn parallel_count_ignores_bad_thread_counts() {
        assert_eq!(parallel_count_primes(1_000_000, 3_000_000, 0).unwrap(), 138_318);
        assert_eq!(parallel_count_primes(1_000_000, 3_000_000, 2).unwrap(), 138_318);
    }

    #[test]
    fn parallel_callback_sees_every_prime_once() {
        let seen = std::sync::Mutex::new(Vec::new());
        let record = |p: u64, chunk: usize| seen.lock().unwrap().push((chunk, p));
        parallel_callback_primes(0, 1_000_000, record, 4).unwrap();

        let mut seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 78_498);
        seen.sort_unstable();
        let chunks = seen.iter().map(|&(chunk, _)| chunk).max().unwrap() + 1;
        for chunk in 0..chunks {
            let primes: Vec<u64> = seen
                .iter()
                .filter(|&&(c, _)| c == chunk)
                .map(|&(_, p)| p)
                .collect();
            assert!(primes.windows(2).all(|w| w[0] < w[1]));
        }
        let mut primes: Vec<u64> = seen.into_iter().map(|(_, p)| p).collect();
        primes.sort_unstable();
        primes.dedup();
        assert_eq!(primes.len(), 78_498);
    }

    #[test]
    fn prints_each_pattern_in_order() {
        let capture = |pattern| {
            let buffer = Arc::new(std::sync::Mutex::new(Vec::<u8>::new()));
            print(0, 50, pattern, PrintTarget::Shared(buffer.clone())).unwrap();
            let bytes = buffer.lock().unwrap().clone();
            String::from_utf8(bytes).unwrap()
        };
        assert_eq!(
            capture(Pattern::Primes),
            "2\n3\n5\n7\n11\n13\n17\n19\n23\n29\n31\n37\n41\n43\n47\n"
        );
        assert_eq!(
            capture(Pattern::Triplets).lines().collect::<Vec<_>>(),
            [
                "(5, 7, 11)",
                "(7, 11, 13)",
                "(11, 13, 17)",
                "(13, 17, 19)",
                "(17, 19, 23)",
                "(37, 41, 43)",
                "(41, 43, 47)",
            ]
        );
        assert_eq!(capture(Pattern::Septuplets), "(11, 13, 17, 19, 23, 29, 31)\n");
        assert!(matches!(print_twins(10, 1), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn generated_primes_are_sorted_and_complete() {
        let primes = generate_primes(0, 100).unwrap();
        assert_eq!(primes.len(), 25);
        assert_eq!(primes.first(), Some(&2));
        assert_eq!(primes.last(), Some(&97));
        assert!(primes.windows(2).all(|w| w[0] < w[1]));
        assert!(generate_primes(24, 28).unwrap().is_empty());
    }

    #[cfg(not(feature = "parking-lot"))]
    #[test]
    fn poisoned_collection_is_an_error() {
        let primes = Mutex::new(vec![1]);
        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = primes.lock();
                panic!("poisoning the lock");
            })
            .join()
        });
        assert!(primes.is_poisoned());
        assert!(matches!(
            collect_primes(0, 100, &primes),
            Err(Error::LockPoisoned)
        ));
        assert!(matches!(into_primes(primes), Err(Error::LockPoisoned)));
    }

    #[test]
    fn first_n_primes_from_an_offset() {
        assert_eq!(
            generate_n_primes(10, 0).unwrap(),
            [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
        );
        assert_eq!(
            generate_n_primes(3, 1_000_000).unwrap(),
            [1_000_003, 1_000_033, 1_000_037]
        );
        assert!(generate_n_primes(0, 5).unwrap().is_empty());
        assert_eq!(generate_n_primes(50_000, 0).unwrap().last(), Some(&611_953));
    }

    #[test]
    fn nth_prime_counts_from_start_inclusive() {
        assert_eq!(nth_prime(1, 0).unwrap(), 2);
        assert_eq!(nth_prime(25, 0).unwrap(), 97);
        assert_eq!(nth_prime(1, 97).unwrap(), 97);
        assert_eq!(nth_prime(1, 98).unwrap(), 101);
        assert_eq!(nth_prime(10_000, 0).unwrap(), 104_729);
        assert!(matches!(
            nth_prime(0, 0),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn parallel_nth_prime_counts_whole_windows_first() {
        assert_eq!(parallel_nth_prime(2_000_000, 0, 2).unwrap(), 32_452_843);
        assert_eq!(
            parallel_nth_prime(1_000_000, 0, 0).unwrap(),
            nth_prime(1_000_000, 0).unwrap()
        );
    }

    #[test]
    fn search_stops_at_max_stop() {
        assert_eq!(window_end(max_stop() - 5, 100).unwrap(), max_stop());
        assert!(matches!(
            window_end(MAX_STOP, 10),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn inverted_range_is_an_error() {
        assert!(matches!(
            count_primes(10, 1),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            generate_primes(10, 1),
            Err(Error::InvalidRange { .. })
        ));
    }
}
