//! Logging setup.
//!
//! The `[logging] level` value is an `EnvFilter` directive string, so it can
//! be a bare level (`info`) or per-target (`chathub=debug,tower_http=info`).
//! `RUST_LOG`, when set and valid, takes precedence.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{ChatHubError, Result};

/// Directive used when neither `RUST_LOG` nor the configured level parses.
const FALLBACK_DIRECTIVE: &str = "info";

/// Pick the filter from `RUST_LOG` or the configured directives.
///
/// Returns a warning to log once the subscriber is installed, if the
/// configured directives were rejected.
fn build_filter(env: Option<&str>, configured: &str) -> (EnvFilter, Option<String>) {
    if let Some(filter) = env.and_then(|directives| EnvFilter::try_new(directives).ok()) {
        return (filter, None);
    }

    match EnvFilter::try_new(configured) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new(FALLBACK_DIRECTIVE),
            Some(format!(
                "Invalid log level {:?} ({}), using {}",
                configured, e, FALLBACK_DIRECTIVE
            )),
        ),
    }
}

fn filter_from_env(configured: &str) -> (EnvFilter, Option<String>) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(env.as_deref(), configured)
}

/// Open the log file for appending, creating its directory if needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Log to stdout and to the configured file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = Arc::new(open_log_file(Path::new(&config.file))?);
    let (filter, warning) = filter_from_env(&config.level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false),
        )
        .with(filter)
        .try_init()
        .map_err(|e| ChatHubError::Config(format!("logging already initialized: {e}")))?;

    if let Some(warning) = warning {
        tracing::warn!("{}", warning);
    }
    Ok(())
}

/// Log to stdout only. Does nothing if a subscriber is already installed.
pub fn init_console_only(level: &str) {
    let (filter, warning) = filter_from_env(level);

    let installed = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(filter)
        .try_init()
        .is_ok();

    if let (true, Some(warning)) = (installed, warning) {
        tracing::warn!("{}", warning);
    }
}
