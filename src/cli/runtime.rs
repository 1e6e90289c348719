use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::env::LogFormat;

/// Load `.env` from the working directory; existing variables win.
pub fn load_local_env_overrides() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded environment overrides"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(?err, "failed to read .env overrides"),
    }
}

/// `--debug` wins over `RUST_LOG`, which wins over `--log-level`.
fn log_filter(level: &str, debug: bool) -> Result<EnvFilter> {
    if debug {
        return Ok(EnvFilter::new("debug"));
    }
    let level: tracing::Level = level.parse().context("Invalid log level")?;
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string())))
}

pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let filter = log_filter(level, debug)?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Human => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping before the next step");
            token.cancel();
        }
    });
}
