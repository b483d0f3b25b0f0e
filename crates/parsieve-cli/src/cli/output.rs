use super::config::SieveConfig;
use parsieve::{Pattern, SieveOutcome, SieveRange};
use serde::Serialize;
use std::io::Write;

/// Result of one invocation as emitted by `--json`.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub range: SieveRange,
    pub threads: usize,
    pub segment_size_kib: u32,
    pub counts: Vec<Count<'a>>,
    pub seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct Count<'a> {
    pub pattern: &'a str,
    pub count: u64,
}

impl<'a> Report<'a> {
    pub fn new(config: &'a SieveConfig, threads: usize, outcome: &SieveOutcome) -> Self {
        Self {
            range: config.range,
            threads,
            segment_size_kib: config.sieve.segment_size_kib(),
            counts: config
                .counted
                .iter()
                .map(|&pattern| Count {
                    pattern: pattern.label(),
                    count: outcome.counters[pattern],
                })
                .collect(),
            seconds: outcome.seconds(),
        }
    }
}

/// Settings echoed before sieving starts.
pub fn write_header(
    out: &mut impl Write,
    config: &SieveConfig,
    threads: usize,
) -> std::io::Result<()> {
    writeln!(out, "Sieve size = {} KiB", config.sieve.segment_size_kib())?;
    writeln!(out, "Threads = {threads}")
}

/// Counts, and elapsed time unless `quiet`.
pub fn write_results(
    out: &mut impl Write,
    config: &SieveConfig,
    outcome: &SieveOutcome,
) -> std::io::Result<()> {
    if !config.quiet {
        writeln!(out, "Seconds: {:.3}", outcome.seconds())?;
    }
    let width = config
        .counted
        .iter()
        .map(|p| p.label().len())
        .max()
        .unwrap_or(0);
    for &pattern in &config.counted {
        if config.quiet {
            writeln!(out, "{}", outcome.counters[pattern])?;
        } else {
            writeln!(
                out,
                "{:<width$} : {}",
                pattern.label(),
                outcome.counters[pattern]
            )?;
        }
    }
    Ok(())
}

pub fn write_json(out: &mut impl Write, report: &Report<'_>) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsieve::{PatternCounters, SieveConfiguration};
    use std::time::Duration;

    fn config(counted: Vec<Pattern>, quiet: bool) -> SieveConfig {
        SieveConfig {
            range: SieveRange::new(0, 1000).unwrap(),
            sieve: SieveConfiguration::default(),
            counted,
            quiet,
            json: false,
        }
    }

    fn outcome() -> SieveOutcome {
        SieveOutcome {
            counters: PatternCounters::from([168, 35, 30, 5, 5, 2, 1]),
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn results_are_aligned_by_label() {
        let mut out = Vec::new();
        let config = config(vec![Pattern::Primes, Pattern::Twins], false);
        write_results(&mut out, &config, &outcome()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Seconds: 1.500\nPrime numbers : 168\nTwin primes   : 35\n"
        );
    }

    #[test]
    fn quiet_prints_bare_counts() {
        let mut out = Vec::new();
        let config = config(vec![Pattern::Primes, Pattern::Triplets], true);
        write_results(&mut out, &config, &outcome()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "168\n30\n");
    }

    #[test]
    fn json_report_lists_counted_patterns() {
        let config = config(vec![Pattern::Twins], false);
        let mut out = Vec::new();
        write_json(&mut out, &Report::new(&config, 2, &outcome())).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["range"]["stop"], 1000);
        assert_eq!(value["threads"], 2);
        assert_eq!(value["counts"][0]["pattern"], "Twin primes");
        assert_eq!(value["counts"][0]["count"], 35);
        assert_eq!(value["seconds"], 1.5);
    }
}
