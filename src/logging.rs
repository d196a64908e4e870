//! Operational logging for the engine itself, separate from the per-task
//! [`crate::trace`] channel.

use anyhow::{Context, Result};
use std::str::FromStr;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Initializes the global `tracing` subscriber. `pretty` selects a
/// human-readable compact format for local development; otherwise logs are
/// emitted as JSON, suited to being shipped somewhere that parses them.
pub fn init_logger(log_level: &str, pretty: bool) -> Result<()> {
    let level =
        LevelFilter::from_str(log_level).context("could not parse 'log_level' configuration")?;

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if pretty {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    }

    Ok(())
}
