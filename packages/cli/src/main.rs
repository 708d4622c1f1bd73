//! CLI entry point.

use carpecarb_cli::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // WARN by default, RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run() {
        tracing::debug!(error = %e, "command failed");
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
