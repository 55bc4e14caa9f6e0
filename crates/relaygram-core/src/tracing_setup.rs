use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::env_vars;

const DEFAULT_FILTER: &str = "relaygram_core=debug,relaygram_tui=debug,info";

/// Log to a file. A terminal UI owns stdout, so nothing is written there.
///
/// The filter comes from `RELAYGRAM_LOG`, falling back to `info` for
/// dependencies and `debug` for our own crates. Calling this twice is a no-op.
pub fn init_tracing(log_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(env_vars::LOG_FILTER)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(())
}
