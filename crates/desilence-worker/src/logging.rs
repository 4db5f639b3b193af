//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable selecting JSON log lines when set to `json`.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

fn use_json() -> bool {
    std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false)
}

/// Filter from `RUST_LOG` plus the crate default level.
pub fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in ["desilence", "desilence_worker", "desilence_media"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber. Logs go to stderr.
pub fn init_tracing(verbose: bool) {
    let env_filter = env_filter(verbose);

    if use_json() {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(verbose)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
