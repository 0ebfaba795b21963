use std::io;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `RUST_LOG` is not set
pub const LOG_ENV: &str = "RTCM3_LOGLEVEL";

/// Installs a stderr subscriber. An explicit `level` wins over the environment,
/// which wins over `info`.
pub fn initialize(level: Option<&str>) -> Result<()> {
    let directive = match level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG")
            .or_else(|_| std::env::var(LOG_ENV))
            .unwrap_or_else(|_| "info".to_string()),
    };
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter {directive:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
