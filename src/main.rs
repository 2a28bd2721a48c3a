//! sia-ant CLI - run a single ant
//!
//! Starts siad, launches the selected jobs, and runs until siad exits or the
//! process is interrupted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sia_ant::jobs::JOBS;
use sia_ant::{Ant, AntConfig};

/// sia-ant - a Sia node that runs scripted user stories
#[derive(Debug, Parser)]
#[command(name = "sia-ant")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Ant configuration file (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<String>,

    /// Path to siad executable
    #[arg(long)]
    siad: Option<String>,

    /// API address to bind siad
    #[arg(long)]
    api_addr: Option<String>,

    /// RPC address to bind siad
    #[arg(long)]
    rpc_addr: Option<String>,

    /// Host address to bind siad
    #[arg(long)]
    host_addr: Option<String>,

    /// Sia data directory
    #[arg(long)]
    sia_directory: Option<String>,

    /// API password, if siad requires one
    #[arg(long)]
    api_password: Option<String>,

    /// Enable gateway test jobs
    #[arg(long)]
    gateway: bool,

    /// Enable mining test jobs
    #[arg(long)]
    mining: bool,

    /// Additional jobs to run (comma-separated)
    #[arg(long, value_delimiter = ',')]
    jobs: Vec<String>,

    /// Siacoin balance to maintain by mining
    #[arg(long)]
    desired_currency: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List available jobs
    List,

    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long)]
        config: String,
    },

    /// Write a starter configuration with every default filled in
    Init {
        /// Where to write the configuration (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn setup_logging(verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.json);

    let result = match cli.command {
        Some(Commands::List) => {
            list_jobs();
            Ok(())
        }
        Some(Commands::Validate { config }) => validate_config(&config),
        Some(Commands::Init { output }) => init_config(output.as_deref()),
        None => return run_ant(cli.run).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Merge the config file (if any) with command line overrides
fn build_config(args: RunArgs) -> Result<AntConfig> {
    let mut config = match &args.config {
        Some(path) => AntConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => AntConfig::default(),
    };

    if let Some(siad) = args.siad {
        config.siad_path = siad;
    }
    if let Some(addr) = args.api_addr {
        config.api_addr = addr;
    }
    if let Some(addr) = args.rpc_addr {
        config.rpc_addr = addr;
    }
    if let Some(addr) = args.host_addr {
        config.host_addr = addr;
    }
    if let Some(dir) = args.sia_directory {
        config.sia_directory = dir;
    }
    if args.api_password.is_some() {
        config.api_password = args.api_password;
    }
    if let Some(sc) = args.desired_currency {
        config.desired_currency = sc;
    }

    let flagged = [("gateway", args.gateway), ("miner", args.mining)]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name.to_string());
    for job in flagged.chain(args.jobs.into_iter().map(|j| j.trim().to_string())) {
        if !job.is_empty() && !config.jobs.contains(&job) {
            config.jobs.push(job);
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run one ant until siad exits or we are interrupted
async fn run_ant(args: RunArgs) -> ExitCode {
    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        siad = %config.siad_path,
        api_addr = %config.api_addr,
        sia_directory = %config.sia_directory,
        jobs = ?config.jobs,
        "Starting ant"
    );

    let mut ant = match Ant::new(config).await {
        Ok(ant) => ant,
        Err(e) => {
            eprintln!("error starting ant: {e}");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        status = ant.wait() => match status {
            Ok(status) => tracing::info!(%status, "siad exited"),
            Err(e) => tracing::warn!(error = %e, "Lost track of siad"),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, closing ant");
        }
    }

    if let Err(e) = ant.close().await {
        tracing::error!(error = %e, "Failed to close ant cleanly");
    }
    ExitCode::SUCCESS
}

/// List available jobs
fn list_jobs() {
    println!("Available jobs:");
    println!();

    let mut jobs: Vec<_> = JOBS.iter().collect();
    jobs.sort_by_key(|(name, _)| **name);

    for (name, job) in jobs {
        println!("  {name:10} - {}", job.description());
    }

    println!();
    println!("Run specific jobs with:");
    println!("  sia-ant --jobs gateway,miner");
}

/// Validate a configuration file
fn validate_config(config_path: &str) -> Result<()> {
    tracing::info!(config = %config_path, "Validating configuration");

    let config = AntConfig::from_file(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    println!("Configuration is valid!");
    println!();
    println!("siad: {}", config.siad_path);
    println!("API address: {}", config.api_addr);
    println!("Data directory: {}", config.sia_directory);
    println!("Jobs: {}", config.jobs.len());

    for job in &config.jobs {
        let status = if JOBS.contains_key(job.as_str()) {
            "known"
        } else {
            "unknown, will be skipped"
        };
        println!("  - {job}: {status}");
    }

    if config.desired_currency != 0 {
        println!("Desired balance: {} SC", config.desired_currency);
    }

    Ok(())
}

/// Emit the default configuration as YAML
fn init_config(output: Option<&str>) -> Result<()> {
    let yaml = AntConfig::default().to_yaml()?;
    match output {
        Some(path) => {
            if std::path::Path::new(path).exists() {
                anyhow::bail!("{path} already exists");
            }
            std::fs::write(path, yaml).with_context(|| format!("Failed to write {path}"))?;
            tracing::info!(config = %path, "Wrote default configuration");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
