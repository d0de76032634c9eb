//! Logging setup shared by the CLI and the HTTP server.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Installs the global subscriber.
///
/// Reads per-module levels from `NESTEGG_LOG` (e.g. `NESTEGG_LOG=nestegg::core=debug`) and falls
/// back to `nestegg=info`. Output goes to stderr so CLI stdout stays machine-readable.
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("NESTEGG_LOG")
            .unwrap_or_else(|_| EnvFilter::new("nestegg=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
