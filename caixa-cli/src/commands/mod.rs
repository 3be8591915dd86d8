//! CLI command implementations

pub mod accounts;
pub mod import;
pub mod logs;
pub mod templates;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use caixa_core::services::{EntryPoint, LogEvent, LoggingService};
use caixa_core::CaixaContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let data_dir = get_caixa_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .map(Arc::new)
        .map_err(|e| tracing::warn!(error = %e, "event log unavailable"))
        .ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from CAIXA_DIR, else ~/.caixa
pub fn get_caixa_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CAIXA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".caixa"))
        .ok_or_else(|| anyhow!("Could not find home directory; set CAIXA_DIR"))
}

/// Open the ledger, with import outcomes going to the event log
pub fn get_context(logger: Option<Arc<LoggingService>>) -> Result<CaixaContext> {
    let data_dir = get_caixa_dir()?;
    let ctx = match logger {
        Some(logger) => CaixaContext::with_logger(&data_dir, logger),
        None => CaixaContext::new(&data_dir),
    };
    ctx.with_context(|| format!("Failed to open ledger in {}", data_dir.display()))
}
