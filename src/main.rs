use anyhow::{Context, Result};
use backup_orchestrator::managers::logging::{self, LoggingConfig, Verbosity};
use backup_orchestrator::utils::interrupt::{Interrupt, INTERRUPTED_EXIT_CODE};
use backup_orchestrator::utils::RealExecutor;
use backup_orchestrator::{config, AdapterContext, AdapterRegistry, RunOrchestrator};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "backup-orchestrator")]
#[command(about = "Dump configured sources, ship them to destinations and report the outcome", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (JSON, or TOML with a .toml extension)
    config: PathBuf,

    /// Log informational messages
    #[arg(short, long)]
    verbose: bool,

    /// Log debug messages
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    // Must stay alive until exit so file logs are flushed
    let verbosity = Verbosity::from_flags(cli.verbose, cli.debug);
    let log_guard = logging::init_logging(&LoggingConfig::from_settings(&config.logging, verbosity))?;

    let interrupt = Interrupt::install().context("Failed to install interrupt handler")?;

    let registry = AdapterRegistry::from_config(&config);
    let context = AdapterContext::new(Arc::new(RealExecutor::with_interrupt(interrupt.clone())));
    let orchestrator = RunOrchestrator::from_config(&config, &registry, &context)?.with_interrupt(interrupt);

    info!("Running backups on host '{}'", orchestrator.hostname());
    let report = orchestrator.run();

    if report.interrupted {
        // exit skips destructors, flush the file log first
        drop(log_guard);
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }

    // Individual source failures were already reported; they do not change the exit status
    info!(
        "Finished: {} of {} source(s) backed up",
        report.succeeded(),
        report.sources.len()
    );
    Ok(())
}
