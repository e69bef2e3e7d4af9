//! Watch command - keep the clone in sync and report setup changes

use std::sync::Arc;

use chrono::Local;
use clap::Args;
use setupsync_core::{Config, SetupPoller, SetupRegistry, SetupWorkspace};
use tokio::sync::mpsc;

/// Arguments for the watch command
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Print each registry change as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Do not read setup names from stdin
    #[arg(long)]
    pub no_input: bool,
}

impl WatchArgs {
    /// Execute the watch command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let workspace = Arc::new(SetupWorkspace::from_config(config)?);
        let poller = SetupPoller::new(Arc::clone(&workspace), config.poll.interval);

        if verbose {
            tracing::info!(
                repo = %config.repository_path()?.display(),
                interval = %humantime::format_duration(config.poll.interval),
                "Starting watch"
            );
        }

        if !self.json {
            println!("Watching {}", config.repository_path()?.display());
            if !self.no_input {
                println!("Type a setup name and press Enter to load it, Ctrl-C to quit.");
            }
            println!();
        }

        let json = self.json;
        let observed = Arc::clone(&workspace);
        let handle = poller.start(
            move |registry| print_registry(registry, observed.active().as_deref(), json),
            |text| eprintln!("[{}] error: {}", timestamp(), text),
        );

        let mut active_rx = workspace.subscribe_active();
        let mut names = if self.no_input {
            None
        } else {
            Some(read_setup_names())
        };

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = active_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if !json {
                        let active = active_rx.borrow_and_update().clone();
                        println!(
                            "[{}] active setup: {}",
                            timestamp(),
                            active.as_deref().unwrap_or("(detached)")
                        );
                    }
                }
                name = recv_name(&mut names), if names.is_some() => {
                    match name {
                        Some(name) => spawn_load(Arc::clone(&workspace), name),
                        None => names = None,
                    }
                }
            }
        }

        handle.shutdown().await?;
        Ok(())
    }
}

/// Read setup names from stdin on a plain thread
///
/// A blocking stdin read inside the runtime would keep the process alive
/// after Ctrl-C until the next newline.
fn read_setup_names() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let name = line.trim();
            if !name.is_empty() && tx.send(name.to_string()).is_err() {
                break;
            }
        }
    });
    rx
}

async fn recv_name(names: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match names {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

/// Switch on a separate task so the prompt stays responsive while git runs
fn spawn_load(workspace: Arc<SetupWorkspace>, name: String) {
    tokio::spawn(async move {
        let result = workspace
            .load_with(&name, |loaded| {
                println!("[{}] loaded setup {}", timestamp(), loaded);
            })
            .await;

        if let Err(e) = result {
            eprintln!("[{}] could not load {}: {}", timestamp(), name, e);
        }
    });
}

fn print_registry(registry: &SetupRegistry, active: Option<&str>, json: bool) {
    if json {
        let line = serde_json::json!({
            "time": Local::now().to_rfc3339(),
            "active": active,
            "setups": registry,
        });
        println!("{}", line);
        return;
    }

    println!("[{}] setups:", timestamp());
    if registry.is_empty() {
        println!("  (none)");
    }
    for setup in registry {
        let marker = if Some(setup.name()) == active { "*" } else { " " };
        println!("  {} {}", marker, setup);
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
