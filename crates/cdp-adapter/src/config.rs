//! Chromium launch configuration.

use chromiumoxide::browser::BrowserConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AdapterError, AdapterErrorKind};

#[derive(Clone, Debug)]
pub struct CdpConfig {
    /// Explicit Chrome/Chromium binary; autodetected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub default_deadline_ms: u64,
    pub launch_timeout_ms: u64,
    /// Disable the Chromium sandbox (needed in some containers).
    pub no_sandbox: bool,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            default_deadline_ms: 30_000,
            launch_timeout_ms: 20_000,
            no_sandbox: false,
        }
    }
}

impl CdpConfig {
    pub(crate) fn browser_config(&self) -> Result<BrowserConfig, AdapterError> {
        if let Some(executable) = &self.executable {
            if !executable.exists() {
                return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!(
                    "chrome executable not found at {}",
                    executable.display()
                )));
            }
        }

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(self.default_deadline_ms))
            .launch_timeout(Duration::from_millis(self.launch_timeout_ms));

        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }

        let mut args = vec![
            "--disable-background-networking",
            "--disable-breakpad",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-sync",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
        ];
        if self.headless {
            args.push("--headless=new");
            args.push("--hide-scrollbars");
            args.push("--mute-audio");
        }
        builder = builder.args(args);

        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable.clone());
        }

        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("browser config error: {err}"))
        })
    }
}
