use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sfexport::config::Cli;
use sfexport::pipeline;

/// Initializes console logging, filterable via `RUST_LOG`.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let opts = cli.into_options();

    match pipeline::run(&opts).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            // Authentication failures land here; nothing was downloaded.
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
