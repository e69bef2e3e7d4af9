//! Load command - switch the working tree to another setup

use clap::Args;
use setupsync_core::{Config, Error, SetupWorkspace};

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Name of the setup (remote branch) to check out
    #[arg(required = true)]
    pub name: String,
}

impl LoadArgs {
    /// Execute the load command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let workspace = SetupWorkspace::from_config(config)?;

        if workspace.active().as_deref() == Some(self.name.as_str()) {
            println!("Setup {} is already active", self.name);
            return Ok(());
        }

        match workspace
            .load_with(&self.name, |name| println!("Loaded setup {}", name))
            .await
        {
            Ok(()) => Ok(()),
            Err(Error::SetupNotFound(name)) => {
                let (_, registry) = workspace.snapshot().await?;
                anyhow::bail!(
                    "No setup named '{}'. Available: {}",
                    name,
                    registry.names().join(", ")
                )
            }
            Err(e) => Err(e.into()),
        }
    }
}
