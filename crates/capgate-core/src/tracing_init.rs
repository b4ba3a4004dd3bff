//! Logging setup for the `capgate` binary.
//!
//! Gate and host events are emitted with `tracing`; this wires them to a
//! stderr subscriber so they never mix with command output on stdout.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown at the configured level.
const CAPGATE_TARGETS: [&str; 3] = ["capgate", "capgate_cli", "capgate_core"];

/// Env-filter directive enabling `level` for every capgate crate.
pub fn default_filter(level: &str) -> String {
    CAPGATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. With `log_json` each event is a
/// JSON line.
pub fn init_tracing(level: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level)),
    );
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_covers_all_capgate_crates() {
        assert_eq!(
            default_filter("debug"),
            "capgate=debug,capgate_cli=debug,capgate_core=debug"
        );
    }
}
