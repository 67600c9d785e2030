// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use lookout_bridge::config::BridgeConfig;

#[derive(Parser)]
#[command(name = "lookout", version, about = "Browser telemetry capture bridge")]
struct Cli {
    #[command(flatten)]
    config: BridgeConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.config) {
        eprintln!("fatal: failed to initialize logging: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = lookout_bridge::run(cli.config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(config: &BridgeConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match &config.log_file {
        Some(path) => {
            rotate_if_oversized(path, config.log_rotate_mb)?;
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

/// Rename an oversized log file to `<name>.old` before opening a fresh one.
fn rotate_if_oversized(path: &std::path::Path, rotate_mb: u64) -> anyhow::Result<()> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Ok(());
    };
    if meta.len() >= rotate_mb * 1024 * 1024 {
        let mut rotated = path.as_os_str().to_owned();
        rotated.push(".old");
        std::fs::rename(path, std::path::PathBuf::from(rotated))?;
    }
    Ok(())
}
