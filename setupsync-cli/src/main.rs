//! setupsync CLI - watch and switch the setups of a shared repository
//!
//! Every remote branch of the configured clone is a "setup"; this binary
//! keeps the clone current and checks out the setup you ask for.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use setupsync_core::{Config, GitRepo};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ListArgs, LoadArgs, WatchArgs};

/// setupsync: keep a setup repository in sync with its remote
#[derive(Parser, Debug)]
#[command(name = "setupsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the local clone (overrides config and env)
    #[arg(long, global = true, env = "SETUPSYNC_REPO")]
    repo: Option<PathBuf>,

    /// Poll interval, e.g. "30s" or "2m" (overrides config and env)
    #[arg(long, global = true, env = "SETUPSYNC_POLL_INTERVAL", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Poll the remote and report setup changes until interrupted
    #[command(visible_alias = "w")]
    Watch(WatchArgs),

    /// List the setups available on the remote
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Check out a setup
    Load(LoadArgs),

    /// Show the active setup
    Active,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.repo.clone(), cli.interval)?;

    if cli.verbose {
        tracing::info!(
            repo = ?config.repository.path,
            remote = %config.repository.remote,
            interval = %humantime::format_duration(config.poll.interval),
            ignore = ?config.setups.ignore,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("setupsync {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Watch(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::List(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Load(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Active) => {
            let repo = GitRepo::open(config.repository_path()?)?;
            match repo.current_branch()? {
                Some(branch) => println!("{}", branch),
                None => println!("(detached)"),
            }
        }
        Some(Commands::Config) => {
            println!("setupsync Configuration");
            println!("=======================");
            println!();
            println!("Repository:");
            println!(
                "  path: {}",
                config
                    .repository
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  remote: {}", config.repository.remote);
            println!("  default_branches: {}", config.repository.default_branches.join(", "));
            println!();
            println!("Polling:");
            println!("  interval: {}", humantime::format_duration(config.poll.interval));
            println!(
                "  command_timeout: {}",
                humantime::format_duration(config.poll.command_timeout)
            );
            println!();
            println!("Setups:");
            if config.setups.ignore.is_empty() {
                println!("  ignore: (none)");
            } else {
                println!("  ignore: {}", config.setups.ignore.join(", "));
            }
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
            if let Err(e) = config.validate() {
                println!();
                println!("Warning: {}", e);
            }
        }
        None => {
            println!("setupsync - keep a setup repository in sync with its remote");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
