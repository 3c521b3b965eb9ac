/*!
Logging initialization for the visited-map binary.

Logs go to stderr so that stdout only carries the JSON report. When built with the
`profiling` feature, library scopes are emitted as tracing spans and their timings are
logged when each span closes.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Default filter when `RUST_LOG` is unset
fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the global tracing subscriber
pub fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));

    let fmt_layer = fmt::layer().with_writer(std::io::stderr);
    #[cfg(feature = "profiling")]
    let fmt_layer = fmt_layer.with_span_events(fmt::format::FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    if cfg!(feature = "profiling") {
        tracing::info!("Logging initialized with span timings (profiling enabled)");
    } else {
        tracing::debug!("Logging initialized");
    }
}
