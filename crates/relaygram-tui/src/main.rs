mod actions;
mod demo;
mod input;
mod render;
mod runtime;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use relaygram_core::session::memory::LocalNetwork;
use relaygram_core::tracing_setup::init_tracing;
use relaygram_core::{CoreConfig, NetworkEnv};

use crate::actions::Dispatcher;
use crate::runtime::run_app;
use crate::ui::App;

#[derive(Parser, Debug)]
#[command(name = "relaygram")]
#[command(about = "Terminal client for wallet-to-wallet messaging")]
#[command(version)]
struct Args {
    /// Wallet address to prefill on the connect screen
    #[arg(long, short)]
    address: Option<String>,

    /// Where display names, session databases and logs are kept
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Network environment: dev, production or local
    #[arg(long)]
    env: Option<String>,

    /// Background refresh interval in seconds
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Seed the offline network with contacts that reply
    #[arg(long)]
    demo: bool,

    /// Log file (default: <data-dir>/relaygram.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Environment first, then command-line flags on top.
fn build_config(args: &Args) -> Result<CoreConfig> {
    let mut config = CoreConfig::from_env();
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(env) = &args.env {
        let env: NetworkEnv = env.parse().map_err(anyhow::Error::msg)?;
        config = config.with_env(env);
    }
    if let Some(secs) = args.poll_secs {
        anyhow::ensure!(secs > 0, "--poll-secs must be positive");
        config = config.with_poll_interval(Duration::from_secs(secs));
    }
    if args.demo {
        // keep demo labels out of the real display-name cache
        let demo_dir = config.data_dir.join("demo");
        config = config.with_data_dir(demo_dir);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;

    let log_path = args.log_file.clone().unwrap_or_else(|| config.log_path());
    init_tracing(&log_path).context("initializing logging")?;
    tracing::info!(env = %config.env, data_dir = %config.data_dir.display(), "Starting relaygram");

    // Set up panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ui::restore_terminal();
        eprintln!("\n\n=== PANIC ===");
        eprintln!("{}", panic_info);
        eprintln!("=============\n");
        original_hook(panic_info);
    }));

    // The network SDK is not linked in; every session runs on the in-process network.
    let network = LocalNetwork::new();
    let (address, _bots) = if args.demo {
        let address = args
            .address
            .clone()
            .unwrap_or_else(|| demo::DEMO_ADDRESS.to_string());
        let bots = demo::seed(&network, &config, &address)
            .await
            .context("seeding demo network")?;
        (Some(address), Some(bots))
    } else {
        (args.address.clone(), None)
    };

    let (dispatcher, outcomes) = Dispatcher::new(config, Arc::new(network));
    let mut app = App::new(address.as_deref());

    let mut terminal = ui::init_terminal()?;
    let result = run_app(&mut terminal, &mut app, &dispatcher, outcomes).await;

    if let Some(core) = app.take_core() {
        core.shutdown().await;
    }
    ui::restore_terminal()?;

    if let Err(err) = &result {
        tracing::error!("Exited with error: {:#}", err);
        eprintln!("Error: {err:#}");
    }
    tracing::info!("Stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::parse_from([
            "relaygram",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--env",
            "production",
            "--poll-secs",
            "30",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.env, NetworkEnv::Production);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn demo_uses_its_own_directory() {
        let args = Args::parse_from(["relaygram", "--data-dir", "/tmp/rg", "--demo"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/rg/demo"));
    }

    #[test]
    fn bad_values_are_rejected() {
        let args = Args::parse_from(["relaygram", "--env", "mainnet"]);
        assert!(build_config(&args).is_err());
        let args = Args::parse_from(["relaygram", "--poll-secs", "0"]);
        assert!(build_config(&args).is_err());
    }
}
