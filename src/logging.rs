//! Diagnostic logging to stderr via `tracing`.
//!
//! Reports go to stdout; log lines never mix with them. The level defaults to
//! `warn` and can be raised with `RUST_LOG` (for example `RUST_LOG=debug`).

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Installs the global subscriber. Later calls are ignored.
pub fn init_tracing(no_color: bool) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(!no_color);

        // A subscriber may already be set (for example by a test harness).
        let _ = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init();
    });
}
