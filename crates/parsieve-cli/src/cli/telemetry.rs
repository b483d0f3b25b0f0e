//! Log output for the `parsieve` binary.
//!
//! Events from the library (chunk dispatch, aborted runs) and from the binary
//! go through `tracing_subscriber::fmt` to stderr, so stdout only ever holds
//! results. Verbosity comes from `RUST_LOG` and defaults to `warn`:
//!
//! ```bash
//! RUST_LOG=parsieve=debug parsieve 1e10 --count 12
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
