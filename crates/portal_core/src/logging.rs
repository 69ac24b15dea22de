use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::PortalConfig;

const LOG_FILE_PREFIX: &str = "portal";

fn default_filter(level: &str) -> String {
    format!(
        "{level},portal_core={level},portal_chain={level},portal_faucet={level},portal_trade={level},portal_app={level}"
    )
}

/// File plus stderr logging under `~/.rooch-portal/logs`. Keep the returned
/// guard alive for the life of the process or buffered lines are lost.
pub fn init_logging(config: &PortalConfig) -> Result<WorkerGuard> {
    let logs_dir = PortalConfig::logs_dir()?;
    let guard = install(&logs_dir, &default_filter(&config.log_level), true)?;
    tracing::debug!(dir = %logs_dir.display(), "logging initialized");
    Ok(guard)
}

/// File-only logging into `logs_dir`, for tests and embedders.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter, false)
}

fn install(logs_dir: &Path, fallback_filter: &str, console: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));

    let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
    // stderr keeps stdout clean for command output.
    let console_layer = console.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_workspace_crates() {
        let filter = default_filter("debug");
        assert!(filter.starts_with("debug,"));
        for krate in ["portal_core", "portal_chain", "portal_faucet", "portal_trade"] {
            assert!(filter.contains(&format!("{krate}=debug")), "missing {krate}");
        }
    }

    #[test]
    fn init_logging_to_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let logs_dir = tmp.path().join("nested").join("logs");
        assert!(!logs_dir.exists());

        // The global subscriber can only be set once per process, so the
        // result may be an error; the directory must exist either way.
        let result = init_logging_to_dir(&logs_dir, "warn");
        assert!(logs_dir.exists());

        if let Err(e) = result {
            assert!(e.to_string().contains("logging"), "unexpected error: {e}");
        }
    }
}
