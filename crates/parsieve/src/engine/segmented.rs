use super::SieveEngine;
use super::wheel::{BIT_VALUES, KTUPLET_COUNTS, SMALL_PATTERNS, WHEEL_PERIOD, bitmasks, byte_index};
use crate::{
    ChunkSink, Flags, Pattern, PatternCounters, ProgressReporter, Result, SieveConfiguration,
};
use std::fmt::Write as _;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Where printed primes and k-tuplets go.
#[derive(Clone, Default)]
pub enum PrintTarget {
    /// Standard output, locked once per flushed segment.
    #[default]
    Stdout,
    /// A shared writer, e.g. a `Vec<u8>` captured by a test or a file.
    Shared(Arc<Mutex<dyn Write + Send>>),
}

impl core::fmt::Debug for PrintTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Stdout => f.write_str("Stdout"),
            Self::Shared(_) => f.write_str("Shared(..)"),
        }
    }
}

impl PrintTarget {
    fn write_all(&self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }
            Self::Shared(writer) => {
                let mut out = writer.lock()?;
                out.write_all(text.as_bytes())?;
            }
        }
        Ok(())
    }
}

/// Reference sequential engine: a segmented sieve of Eratosthenes over the
/// modulo 30 wheel.
///
/// Each segment holds `segment_size_kib * 1024` wheel bytes, i.e. covers
/// `30 * 1024 * segment_size_kib` numbers. Sieving primes up to
/// `sqrt(stop)` are generated per call, so memory use is roughly
/// `pi(sqrt(stop)) * 8` bytes plus one segment.
///
/// # Example
/// ```
/// use parsieve::{Pattern, SegmentedSieve, SieveConfiguration, SieveEngine};
///
/// let config = SieveConfiguration::default();
/// let counts = SegmentedSieve::new().sieve(0, 1000, &config, None).unwrap();
/// assert_eq!(counts[Pattern::Primes], 168);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SegmentedSieve {
    output: PrintTarget,
}

impl SegmentedSieve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that prints into `output` instead of stdout.
    pub fn with_output(output: PrintTarget) -> Self {
        Self { output }
    }
}

impl SieveEngine for SegmentedSieve {
    fn sieve(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
    ) -> Result<PatternCounters> {
        self.sieve_with_progress(start, stop, config, sink, &())
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, config, sink, progress))
    )]
    fn sieve_with_progress(
        &self,
        start: u64,
        stop: u64,
        config: &SieveConfiguration,
        sink: Option<ChunkSink<'_>>,
        progress: &dyn ProgressReporter,
    ) -> Result<PatternCounters> {
        let mut job = Job::new(start, stop, config.flags(), sink, &self.output, progress);
        job.small_patterns();
        job.flush()?;
        if stop >= 7 {
            job.wheel(config.segment_size_bytes())?;
        }
        Ok(job.counters)
    }
}

/// State for sieving one sub-range.
struct Job<'a> {
    start: u64,
    stop: u64,
    flags: Flags,
    sink: Option<ChunkSink<'a>>,
    output: &'a PrintTarget,
    progress: &'a dyn ProgressReporter,
    printed: Option<Pattern>,
    text: String,
    counters: PatternCounters,
}

impl<'a> Job<'a> {
    fn new(
        start: u64,
        stop: u64,
        flags: Flags,
        sink: Option<ChunkSink<'a>>,
        output: &'a PrintTarget,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            start,
            stop,
            flags,
            sink,
            output,
            progress,
            printed: flags.printed_pattern(),
            text: String::new(),
            counters: PatternCounters::new(),
        }
    }

    /// 2, 3, 5 and the tuplets containing them.
    fn small_patterns(&mut self) {
        if self.start > 5 {
            return;
        }
        for (pattern, members) in SMALL_PATTERNS {
            let (first, last) = (members[0], members[members.len() - 1]);
            if self.start > first || self.stop < last {
                continue;
            }
            if self.flags.counts(pattern) {
                self.counters[pattern] += 1;
            }
            if pattern == Pattern::Primes {
                if let Some(sink) = &self.sink {
                    sink.emit(first);
                }
            }
            if self.printed == Some(pattern) {
                self.print_members(members);
            }
        }
    }

    fn wheel(&mut self, bytes_per_segment: usize) -> Result<()> {
        let low = self.start.max(7);
        let first_byte = byte_index(low);
        let last_byte = byte_index(self.stop);
        let primes = sieving_primes(self.stop.isqrt());

        let mut composite = Vec::new();
        let mut bytes = Vec::with_capacity(bytes_per_segment);
        let mut seg_first = first_byte;
        let mut reported = self.start;
        loop {
            let seg_last = last_byte.min(seg_first + bytes_per_segment as u64 - 1);
            self.sieve_segment(seg_first, seg_last, low, &primes, &mut composite, &mut bytes);
            self.analyse(seg_first, &bytes);
            self.flush()?;

            let covered = self.stop.min(WHEEL_PERIOD * seg_last + BIT_VALUES[7]);
            self.progress.report(covered.saturating_sub(reported))?;
            reported = reported.max(covered);
            if seg_last == last_byte {
                break;
            }
            seg_first = seg_last + 1;
        }
        Ok(())
    }

    /// Crosses off multiples of `primes` and packs the survivors of
    /// `[max(low, 30 * seg_first + 7), min(stop, 30 * seg_last + 31)]` into
    /// wheel bytes.
    fn sieve_segment(
        &self,
        seg_first: u64,
        seg_last: u64,
        low: u64,
        primes: &[u64],
        composite: &mut Vec<bool>,
        bytes: &mut Vec<u8>,
    ) {
        let base = WHEEL_PERIOD * seg_first + BIT_VALUES[0];
        let top = WHEEL_PERIOD * seg_last + BIT_VALUES[7];
        let len = ((top - base) / 2 + 1) as usize;
        composite.clear();
        composite.resize(len, false);
        cross_off(base, top, primes, composite);

        bytes.clear();
        for k in seg_first..=seg_last {
            let mut byte = 0u8;
            for (bit, value) in BIT_VALUES.iter().enumerate() {
                let n = WHEEL_PERIOD * k + value;
                if n >= low && n <= self.stop && !composite[((n - base) / 2) as usize] {
                    byte |= 1 << bit;
                }
            }
            bytes.push(byte);
        }
    }

    /// Counts, emits and prints the wheel bytes of one segment.
    fn analyse(&mut self, seg_first: u64, bytes: &[u8]) {
        if self.flags.counts(Pattern::Primes) {
            self.counters[Pattern::Primes] +=
                bytes.iter().map(|b| u64::from(b.count_ones())).sum::<u64>();
        }
        for pattern in &Pattern::ALL[1..] {
            if self.flags.counts(*pattern) {
                let table = &KTUPLET_COUNTS[pattern.index() - 1];
                self.counters[*pattern] +=
                    bytes.iter().map(|&b| u64::from(table[b as usize])).sum::<u64>();
            }
        }

        if self.sink.is_none() && self.printed.is_none() {
            return;
        }
        for (offset, &byte) in bytes.iter().enumerate() {
            if byte == 0 {
                continue;
            }
            let lower = WHEEL_PERIOD * (seg_first + offset as u64);
            if let Some(sink) = &self.sink {
                for_each_bit(byte, |bit| sink.emit(lower + BIT_VALUES[bit]));
            }
            match self.printed {
                Some(Pattern::Primes) => {
                    for_each_bit(byte, |bit| {
                        let _ = writeln!(self.text, "{}", lower + BIT_VALUES[bit]);
                    });
                }
                Some(pattern) => {
                    for &mask in bitmasks(pattern) {
                        if byte & mask == mask {
                            let mut members = Vec::with_capacity(pattern.size());
                            for_each_bit(mask, |bit| members.push(lower + BIT_VALUES[bit]));
                            self.print_members(&members);
                        }
                    }
                }
                None => {}
            }
        }
    }

    fn print_members(&mut self, members: &[u64]) {
        if let [prime] = members {
            let _ = writeln!(self.text, "{prime}");
            return;
        }
        self.text.push('(');
        for (i, n) in members.iter().enumerate() {
            if i > 0 {
                self.text.push_str(", ");
            }
            let _ = write!(self.text, "{n}");
        }
        self.text.push_str(")\n");
    }

    fn flush(&mut self) -> Result<()> {
        self.output.write_all(&self.text)?;
        self.text.clear();
        Ok(())
    }
}

#[inline]
fn for_each_bit(mut byte: u8, mut f: impl FnMut(usize)) {
    while byte != 0 {
        f(byte.trailing_zeros() as usize);
        byte &= byte - 1;
    }
}

/// Marks odd composites of `[base, top]` (both odd) in `composite`, where
/// index `i` stands for `base + 2i`.
fn cross_off(base: u64, top: u64, primes: &[u64], composite: &mut [bool]) {
    for &p in primes {
        let square = p * p;
        if square > top {
            break;
        }
        let mut multiple = square.max(base.div_ceil(p) * p);
        if multiple % 2 == 0 {
            multiple += p;
        }
        let mut i = ((multiple - base) / 2) as usize;
        while i < composite.len() {
            composite[i] = true;
            i += p as usize;
        }
    }
}

/// Number of odd values per segment when generating sieving primes.
const PRIME_SEGMENT_ODDS: usize = 1 << 15;

/// Odd primes in `[3, limit]`, in increasing order.
///
/// Primes up to `sqrt(limit)` come from a plain sieve; the rest are
/// generated segment by segment so memory stays proportional to the output.
pub(crate) fn sieving_primes(limit: u64) -> Vec<u64> {
    if limit < 3 {
        return Vec::new();
    }
    let seeds = small_odd_primes(limit.isqrt());
    let mut primes = Vec::new();
    let mut composite = vec![false; PRIME_SEGMENT_ODDS];
    let mut base = 3u64;
    while base <= limit {
        let len = (((limit - base) / 2) as usize + 1).min(PRIME_SEGMENT_ODDS);
        let top = base + 2 * (len as u64 - 1);
        composite[..len].fill(false);
        cross_off(base, top, &seeds, &mut composite[..len]);
        primes.extend(
            composite[..len]
                .iter()
                .enumerate()
                .filter(|&(_, &c)| !c)
                .map(|(i, _)| base + 2 * i as u64),
        );
        base = top + 2;
    }
    primes
}

/// Odd primes in `[3, limit]` by trial-free plain sieve; `limit` is small.
fn small_odd_primes(limit: u64) -> Vec<u64> {
    let limit = limit as usize;
    if limit < 3 {
        return Vec::new();
    }
    let mut composite = vec![false; limit + 1];
    let mut primes = Vec::new();
    for n in (3..=limit).step_by(2) {
        if composite[n] {
            continue;
        }
        primes.push(n as u64);
        let mut m = n * n;
        while m <= limit {
            composite[m] = true;
            m += 2 * n;
        }
    }
    primes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(flags: Flags) -> SieveConfiguration {
        SieveConfiguration::builder().flags(flags).build().unwrap()
    }

    fn count_all(start: u64, stop: u64) -> [u64; 7] {
        *SegmentedSieve::new()
            .sieve(start, stop, &config(Flags::COUNT_FLAGS), None)
            .unwrap()
            .as_array()
    }

    fn naive_primes(start: u64, stop: u64) -> Vec<u64> {
        (start..=stop)
            .filter(|&n| n > 1 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0))
            .collect()
    }

    #[test]
    fn sieving_primes_match_naive() {
        let expected: Vec<u64> = naive_primes(3, 100_000);
        assert_eq!(sieving_primes(100_000), expected);
        assert_eq!(sieving_primes(2), Vec::<u64>::new());
        assert_eq!(sieving_primes(3), vec![3]);
    }

    #[test]
    fn counts_below_one_thousand() {
        assert_eq!(count_all(0, 1000), [168, 35, 30, 5, 5, 2, 1]);
    }

    #[test]
    fn counts_below_one_hundred_thousand() {
        assert_eq!(count_all(0, 100_000), [9592, 1224, 507, 38, 21, 5, 1]);
    }

    #[test]
    fn small_patterns_need_every_member_in_range() {
        assert_eq!(count_all(0, 10), [4, 2, 0, 0, 0, 0, 0]);
        assert_eq!(count_all(5, 17), [5, 2, 3, 1, 1, 0, 0]);
        assert_eq!(count_all(6, 17), [4, 1, 2, 0, 0, 0, 0]);
        assert_eq!(count_all(4, 4), [0; 7]);
        assert_eq!(count_all(2, 2), [1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn only_flagged_patterns_are_counted() {
        let counts = SegmentedSieve::new()
            .sieve(0, 1000, &config(Flags::COUNT_TWINS), None)
            .unwrap();
        assert_eq!(*counts.as_array(), [0, 35, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn tiny_segments_agree_with_default_segments() {
        let small = SieveConfiguration::builder()
            .flags(Flags::COUNT_FLAGS)
            .segment_size_kib(1)
            .build()
            .unwrap();
        let counts = SegmentedSieve::new().sieve(0, 100_000, &small, None).unwrap();
        assert_eq!(*counts.as_array(), count_all(0, 100_000));
    }

    #[test]
    fn sink_receives_primes_in_order() {
        let seen = std::sync::Mutex::new(Vec::new());
        let callback = |p: u64| seen.lock().unwrap().push(p);
        SegmentedSieve::new()
            .sieve(0, 5_000, &config(Flags::NONE), Some(ChunkSink::new(&callback, 0)))
            .unwrap();
        assert_eq!(seen.into_inner().unwrap(), naive_primes(0, 5_000));
    }

    #[test]
    fn prints_twins_in_order() {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let engine = SegmentedSieve::with_output(PrintTarget::Shared(buffer.clone()));
        engine.sieve(0, 45, &config(Flags::PRINT_TWINS), None).unwrap();

        let bytes = buffer.lock().unwrap().clone();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "(3, 5)\n(5, 7)\n(11, 13)\n(17, 19)\n(29, 31)\n(41, 43)\n"
        );
    }

    #[test]
    fn prints_primes_one_per_line() {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let engine = SegmentedSieve::with_output(PrintTarget::Shared(buffer.clone()));
        engine.sieve(10, 30, &config(Flags::PRINT_PRIMES), None).unwrap();

        let bytes = buffer.lock().unwrap().clone();
        assert_eq!(String::from_utf8(bytes).unwrap(), "11\n13\n17\n19\n23\n29\n");
    }

    /// Keeps every report it receives.
    struct Reports(Mutex<Vec<u64>>);

    impl ProgressReporter for Reports {
        fn report(&self, processed: u64) -> Result<()> {
            self.0.lock().unwrap().push(processed);
            Ok(())
        }
    }

    #[test]
    fn reports_progress_once_per_segment() {
        let small = SieveConfiguration::builder()
            .flags(Flags::COUNT_PRIMES)
            .segment_size_kib(1)
            .build()
            .unwrap();
        let reports = Reports(Mutex::new(Vec::new()));
        let counts = SegmentedSieve::new()
            .sieve_with_progress(1_000, 1_000_000, &small, None, &reports)
            .unwrap();
        assert_eq!(counts[Pattern::Primes], 78_498 - 168);

        // 1 KiB segments cover 30 * 1024 numbers each.
        let reports = reports.0.into_inner().unwrap();
        assert_eq!(reports.len(), 33);
        assert!(reports.iter().all(|&r| r > 0));
        assert_eq!(reports.iter().sum::<u64>(), 1_000_000 - 1_000);
    }

    #[test]
    fn progress_errors_stop_the_engine() {
        struct Refuse;
        impl ProgressReporter for Refuse {
            fn report(&self, _: u64) -> Result<()> {
                Err(crate::Error::LockPoisoned)
            }
        }
        let result =
            SegmentedSieve::new().sieve_with_progress(0, 100, &config(Flags::NONE), None, &Refuse);
        assert!(matches!(result, Err(crate::Error::LockPoisoned)));
    }
}
