use anyhow::{Context, bail};
use clap::Parser;
use parsieve::{Flags, MAX_SEGMENT_SIZE_KIB, Pattern, SieveConfiguration, SieveRange};

/// Command-line arguments for the `parsieve` binary.
///
/// Numbers accept digit separators (`1_000_000`), scientific notation
/// (`1e10`) and powers (`2^32`).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "parsieve",
    version,
    about = "Count and print primes and prime k-tuplets in parallel"
)]
pub struct CliArgs {
    /// Start of the interval, or its end if STOP is omitted.
    #[arg(value_parser = parse_number)]
    pub start: u64,

    /// End of the interval (inclusive).
    #[arg(value_parser = parse_number, conflicts_with = "offset")]
    pub stop: Option<u64>,

    /// Sieve `[START, START + OFFSET]` instead of `[START, STOP]`.
    #[arg(short = 'd', long, value_parser = parse_number)]
    pub offset: Option<u64>,

    /// Patterns to count, as digits: 1 primes, 2 twins, ..., 7 septuplets.
    ///
    /// `--count 12` counts primes and twin primes. Defaults to primes unless
    /// `--print` is given.
    #[arg(short, long, value_parser = parse_patterns)]
    pub count: Option<PatternSet>,

    /// Print the primes (1) or k-tuplets (2..=7) of one pattern, in order.
    ///
    /// Printing runs on a single thread.
    #[arg(short, long, value_parser = parse_pattern)]
    pub print: Option<Pattern>,

    /// Engine segment size in KiB, a power of 2.
    ///
    /// Environment variable: `PARSIEVE_SIZE`
    #[arg(
        short,
        long,
        env = "PARSIEVE_SIZE",
        default_value_t = parsieve::DEFAULT_SEGMENT_SIZE_KIB
    )]
    pub size: u32,

    /// Number of worker threads. Out-of-range values pick the ideal count.
    ///
    /// Environment variable: `PARSIEVE_THREADS`
    #[arg(short, long, env = "PARSIEVE_THREADS")]
    pub threads: Option<usize>,

    /// Minimum numbers per worker before a run is split across threads.
    ///
    /// Environment variable: `PARSIEVE_MIN_THREAD_INTERVAL`
    #[arg(
        long,
        env = "PARSIEVE_MIN_THREAD_INTERVAL",
        value_parser = parse_number,
        default_value_t = parsieve::MIN_THREAD_INTERVAL
    )]
    pub min_thread_interval: u64,

    /// Print only the counts.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Show progress on stderr while sieving.
    #[arg(long, default_value_t = false)]
    pub status: bool,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false, conflicts_with = "print")]
    pub json: bool,
}

/// Patterns selected by a digit string such as `123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet(pub Vec<Pattern>);

/// Validated settings for one invocation.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    pub range: SieveRange,
    pub sieve: SieveConfiguration,
    pub counted: Vec<Pattern>,
    pub quiet: bool,
    pub json: bool,
}

impl SieveConfig {
    /// `true` if primes or k-tuplets are written to stdout.
    pub fn prints(&self) -> bool {
        self.sieve.flags().requires_ordered_output()
    }
}

impl TryFrom<CliArgs> for SieveConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let (start, stop) = match (args.stop, args.offset) {
            (Some(stop), _) => (args.start, stop),
            (None, Some(offset)) => (
                args.start,
                args.start
                    .checked_add(offset)
                    .context("START + OFFSET overflows")?,
            ),
            (None, None) => (0, args.start),
        };
        if stop < start {
            bail!("STOP ({stop}) must be >= START ({start})");
        }
        if args.size == 0 || args.size > MAX_SEGMENT_SIZE_KIB || !args.size.is_power_of_two() {
            bail!(
                "SIZE ({}) must be a power of 2 between 1 and {MAX_SEGMENT_SIZE_KIB} KiB",
                args.size
            );
        }

        let mut counted = args.count.map(|set| set.0).unwrap_or_default();
        if counted.is_empty() && args.print.is_none() {
            counted.push(Pattern::Primes);
        }
        counted.sort_unstable();
        counted.dedup();

        let mut flags = Flags::NONE;
        for &pattern in &counted {
            flags |= Flags::count(pattern);
        }
        if let Some(pattern) = args.print {
            flags |= Flags::print(pattern);
        }
        if args.status {
            flags |= Flags::PRINT_STATUS;
        }

        let sieve = SieveConfiguration::builder()
            .flags(flags)
            .segment_size_kib(args.size)
            .requested_threads(args.threads)
            .min_thread_interval(args.min_thread_interval)
            .build()?;

        Ok(Self {
            range: SieveRange::new(start, stop)?,
            sieve,
            counted,
            quiet: args.quiet,
            json: args.json,
        })
    }
}

/// Parses `123`, `1_000`, `1e10` or `2^32` into a `u64`.
pub fn parse_number(input: &str) -> anyhow::Result<u64> {
    let text: String = input.chars().filter(|c| *c != '_' && *c != ',').collect();
    let text = text.trim();
    if let Some((base, exp)) = text.split_once('^') {
        let base: u64 = base.trim().parse().context("invalid base")?;
        let exp: u32 = exp.trim().parse().context("invalid exponent")?;
        return base.checked_pow(exp).context("number overflows u64");
    }
    if let Some((mantissa, exp)) = text.split_once(['e', 'E']) {
        let mantissa: u64 = mantissa.trim().parse().context("invalid mantissa")?;
        let exp: u32 = exp.trim().parse().context("invalid exponent")?;
        return 10u64
            .checked_pow(exp)
            .and_then(|p| p.checked_mul(mantissa))
            .context("number overflows u64");
    }
    text.parse().with_context(|| format!("invalid number `{input}`"))
}

fn parse_pattern(input: &str) -> anyhow::Result<Pattern> {
    let digit: usize = input.trim().parse().context("expected a digit 1..=7")?;
    match digit.checked_sub(1).and_then(Pattern::from_index) {
        Some(pattern) => Ok(pattern),
        None => bail!("pattern must be between 1 and 7, got {digit}"),
    }
}

fn parse_patterns(input: &str) -> anyhow::Result<PatternSet> {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| parse_pattern(c.encode_utf8(&mut [0; 4])))
        .collect::<anyhow::Result<_>>()
        .map(PatternSet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<SieveConfig> {
        let args =
            CliArgs::try_parse_from(std::iter::once("parsieve").chain(args.iter().copied()))?;
        SieveConfig::try_from(args)
    }

    #[test]
    fn numbers_accept_common_notations() {
        assert_eq!(parse_number("1_000_000").unwrap(), 1_000_000);
        assert_eq!(parse_number("1e10").unwrap(), 10_000_000_000);
        assert_eq!(parse_number("3E2").unwrap(), 300);
        assert_eq!(parse_number("2^32").unwrap(), 4_294_967_296);
        assert!(parse_number("2^64").is_err());
        assert!(parse_number("ten").is_err());
    }

    #[test]
    fn single_number_is_the_stop() {
        let config = parse(&["1000"]).unwrap();
        assert_eq!(config.range, SieveRange::new(0, 1000).unwrap());
        assert_eq!(config.counted, vec![Pattern::Primes]);
        assert!(!config.prints());
    }

    #[test]
    fn offset_extends_start() {
        let config = parse(&["1e9", "--offset", "1e6"]).unwrap();
        assert_eq!(
            config.range,
            SieveRange::new(1_000_000_000, 1_001_000_000).unwrap()
        );
    }

    #[test]
    fn count_digits_select_patterns() {
        let config = parse(&["0", "100", "--count", "231"]).unwrap();
        assert_eq!(
            config.counted,
            vec![Pattern::Primes, Pattern::Twins, Pattern::Triplets]
        );
        assert!(config.sieve.flags().counts(Pattern::Twins));
        assert!(!config.sieve.flags().counts(Pattern::Quadruplets));
        assert!(parse(&["100", "--count", "8"]).is_err());
    }

    #[test]
    fn print_disables_default_count() {
        let config = parse(&["100", "--print", "2"]).unwrap();
        assert!(config.counted.is_empty());
        assert!(config.prints());
        assert_eq!(config.sieve.flags().printed_pattern(), Some(Pattern::Twins));
    }

    #[test]
    fn rejects_inverted_range_and_bad_size() {
        assert!(parse(&["100", "10"]).is_err());
        assert!(parse(&["100", "--size", "48"]).is_err());
        assert!(parse(&["100", "--size", "0"]).is_err());
    }
}
