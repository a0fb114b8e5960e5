//! DiskWatch Agent - Physical disk health monitor with Telegram alerts
//!
//! Entry point for every way the monitor runs:
//! - `run`: foreground loop until Ctrl-C
//! - `check` (alias `test`): one stateful check plus a summary notification
//! - `install` / `remove`: Windows service registration
//! - `service`: invoked by the Service Control Manager

mod logging;
#[cfg(windows)]
mod service;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use diskwatch_core::{MonitorConfig, Orchestrator};
use logging::LogTarget;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "diskwatch",
    version,
    about = "Watch disk reliability counters and report changes to Telegram"
)]
struct Cli {
    /// Configuration file (default: <config dir>/diskwatch/config.toml)
    #[arg(long, global = true, env = "DISKWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Monitor in the foreground until Ctrl-C
    Run,
    /// Run a one-time check and send a summary notification
    #[command(alias = "test")]
    Check,
    /// Install the Windows service
    Install,
    /// Remove the Windows service
    Remove,
    #[command(hide = true)]
    Service,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_target = match cli.command {
        Command::Service => LogTarget::File(logging::log_file_beside_executable()?),
        _ => LogTarget::Stdout,
    };
    logging::init(&log_target)?;

    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Command::Run => runtime()?.block_on(run_foreground(&config_path)),
        Command::Check => runtime()?.block_on(run_check(&config_path)),
        Command::Install => install(&config_path),
        Command::Remove => remove(),
        Command::Service => run_as_service(config_path),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

/// Explicit path made absolute, otherwise the per-user default
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_absolute() => Ok(path),
        Some(path) => Ok(std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path)),
        None => MonitorConfig::config_file_path().context("Failed to locate configuration file"),
    }
}

pub(crate) async fn build_orchestrator(config_path: &Path) -> Result<Orchestrator> {
    let config = MonitorConfig::load(config_path)
        .await
        .context("Failed to load configuration")?;
    Orchestrator::from_config(&config).context("Failed to initialise monitor")
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            token.cancel();
        }
    });
    shutdown
}

async fn run_foreground(config_path: &Path) -> Result<()> {
    info!("DiskWatch Agent v{} starting...", env!("CARGO_PKG_VERSION"));
    let orchestrator = build_orchestrator(config_path).await?;

    orchestrator.run(shutdown_on_ctrl_c()).await;

    info!("DiskWatch Agent stopped");
    Ok(())
}

async fn run_check(config_path: &Path) -> Result<()> {
    let orchestrator = build_orchestrator(config_path).await?;

    println!("Running a one-time stateful check...");
    let report = orchestrator.run_manual_check(&shutdown_on_ctrl_c()).await;
    info!(
        "Manual check finished: {:?}, {} active problem(s), probe failing: {}, summary: {:?}",
        report.cycle, report.active_problems, report.probe_failing, report.summary_delivery
    );

    println!("Test complete. See log for details.");
    Ok(())
}

#[cfg(windows)]
fn install(config_path: &Path) -> Result<()> {
    service::install(config_path)?;
    println!("Service {} installed successfully.", service::SERVICE_NAME);
    Ok(())
}

#[cfg(windows)]
fn remove() -> Result<()> {
    service::remove()?;
    println!("Service {} removed successfully.", service::SERVICE_NAME);
    Ok(())
}

#[cfg(windows)]
fn run_as_service(config_path: PathBuf) -> Result<()> {
    service::run_dispatcher(config_path)
}

#[cfg(not(windows))]
fn install(_config_path: &Path) -> Result<()> {
    anyhow::bail!("service installation is only supported on Windows; use `diskwatch run` under your init system")
}

#[cfg(not(windows))]
fn remove() -> Result<()> {
    anyhow::bail!("service removal is only supported on Windows")
}

#[cfg(not(windows))]
fn run_as_service(_config_path: PathBuf) -> Result<()> {
    anyhow::bail!("service mode is only supported on Windows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_test_is_an_alias_for_check() {
        let cli = Cli::try_parse_from(["diskwatch", "test"]).unwrap();
        assert_eq!(cli.command, Command::Check);
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["diskwatch", "service", "--config", "C:\\diskwatch\\config.toml"])
                .unwrap();
        assert_eq!(cli.command, Command::Service);
        assert_eq!(cli.config, Some(PathBuf::from("C:\\diskwatch\\config.toml")));
    }

    #[test]
    fn test_relative_config_is_made_absolute() {
        let path = resolve_config_path(Some(PathBuf::from("config.toml"))).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("config.toml"));
    }

    #[tokio::test]
    async fn test_missing_config_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let Err(err) = build_orchestrator(&path).await else {
            panic!("expected build_orchestrator to fail");
        };
        assert!(format!("{:#}", err).contains("template"));
        assert!(path.exists());
    }
}
