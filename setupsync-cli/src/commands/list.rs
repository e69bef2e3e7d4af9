//! List command - show the setups available on the remote

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use setupsync_core::{Config, SetupPoller, SetupRegistry, SetupWorkspace};

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Use the local view of the remote instead of pruning and pulling first
    #[arg(long)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Listing<'a> {
    active: Option<&'a str>,
    setups: &'a SetupRegistry,
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let workspace = Arc::new(SetupWorkspace::from_config(config)?);

        let registry = if self.offline {
            workspace.snapshot().await?.1
        } else {
            let mut poller = SetupPoller::new(Arc::clone(&workspace), config.poll.interval);
            // a fresh poller always reports its first cycle
            poller.poll_once().await?.unwrap_or_default()
        };
        let active = workspace.active();

        if self.json {
            let listing = Listing {
                active: active.as_deref(),
                setups: &registry,
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(());
        }

        if registry.is_empty() {
            println!("No setups found.");
            return Ok(());
        }

        for setup in &registry {
            let marker = if Some(setup.name()) == active.as_deref() { "*" } else { " " };
            println!("{} {}", marker, setup);
        }

        Ok(())
    }
}
