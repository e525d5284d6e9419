mod bootstrap;
mod error;
mod model;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use bootstrap::{Bootstrapper, SetupReport};
use model::config::SetupConfig;
use model::policy::FailurePolicy;
use runner::{CommandRunner, DryRunRunner, SystemRunner};

/// Clone and bootstrap vcpkg, then install the native dependency set.
#[derive(Debug, Parser)]
#[command(name = "vendor-setup", version, about)]
struct Cli {
    /// Repository root. Defaults to two levels above the executable.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Config file to use instead of the user config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop at the first command that fails.
    #[arg(long)]
    strict: bool,

    /// Print the commands without running them or touching the filesystem.
    #[arg(long)]
    dry_run: bool,

    /// Override the target triple appended to every install.
    #[arg(long)]
    triple: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging();

    match run(cli) {
        Ok(report) => {
            println!("vendor setup: {}", report.summary());
            for notice in report.failure_notifications() {
                println!("  {notice}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("vendor setup failed: {err:#}");
            eprintln!("vendor-setup error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

/// Stderr plus a daily log file. The returned guard flushes the file writer
/// on drop.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vendor_setup=info"))
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let log_dir = directories::ProjectDirs::from("", "", "vendor-setup")
        .map(|d| d.data_dir().to_path_buf())
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, "vendor-setup.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Some(guard)
}

fn run(cli: Cli) -> Result<SetupReport> {
    let mut config = SetupConfig::load(cli.config.as_deref())?;
    if let Some(triple) = cli.triple {
        config.install.triple = triple;
    }

    let policy = if cli.strict {
        FailurePolicy::Halt
    } else {
        config.policy()
    };

    let root = match cli.root {
        Some(root) => std::path::absolute(&root)
            .with_context(|| format!("cannot resolve --root {}", root.display()))?,
        None => bootstrap::resolve_root(&bootstrap::resolve_self_path()?)?,
    };
    tracing::info!("repository root: {}", root.display());

    if cli.dry_run {
        let mut runner = DryRunRunner::default();
        let report = setup(&config, &mut runner, root, policy, true)?;
        tracing::info!("dry run listed {} commands", runner.executed);
        Ok(report)
    } else {
        setup(&config, SystemRunner, root, policy, false)
    }
}

fn setup<R: CommandRunner>(
    config: &SetupConfig,
    runner: R,
    root: PathBuf,
    policy: FailurePolicy,
    dry_run: bool,
) -> Result<SetupReport> {
    let report = Bootstrapper::new(config, runner, root)
        .with_policy(policy)
        .with_dry_run(dry_run)
        .run()?;
    Ok(report)
}
