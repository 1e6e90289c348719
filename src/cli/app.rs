use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::env::CliArgs;
use super::runtime::{cancel_on_ctrl_c, init_logging, load_local_env_overrides};
use crate::config::ExportConfig;
use crate::runner::ExportRunner;

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_format)?;

    info!("Starting livetrack-export v{}", env!("CARGO_PKG_VERSION"));

    let config = ExportConfig::load(cli.config.as_deref()).context("configuration error")?;
    debug!(?config, "Configuration loaded");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match ExportRunner::new(config).run(!cli.headed, &cancel).await {
        Ok(artifact) => {
            info!(path = %artifact.saved_path.display(), "Export completed successfully");
            println!("Saved → {}", artifact.saved_path.display());
            Ok(())
        }
        Err(err) => {
            error!("Export failed: {:#}", err);
            Err(err)
        }
    }
}
