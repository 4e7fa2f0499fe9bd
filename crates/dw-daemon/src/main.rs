//! dw-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, parses the command
//! line, and hands off to [`dw_daemon::run`]. All wiring lives in `lib.rs`.

use clap::Parser;

/// CDC row-count consistency monitor.
#[derive(Parser, Debug)]
#[command(name = "dw-daemon", version)]
struct Args {
    /// Base YAML config file.
    #[arg(short, long, default_value = "driftwatch.yaml")]
    config: String,

    /// Optional override file layered on top of the base config.
    #[arg(long)]
    config_local: Option<String>,

    /// Comma-separated source schemas, overriding `source.schemas`.
    #[arg(short, long)]
    schemas: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present. Silent if the file does not exist —
    // production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let args = Args::parse();
    let schemas_override = args.schemas.map(|s| {
        s.split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
    });

    dw_daemon::run(dw_daemon::RunOptions {
        config_path: args.config,
        local_config_path: args.config_local,
        schemas_override,
    })
    .await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
