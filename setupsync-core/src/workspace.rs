//! The shared workspace: one repository handle behind one lock
//!
//! Every operation that touches the clone (prune, pull, listing, checkout)
//! runs while holding [`SetupWorkspace`]'s mutex, so a poll cycle and any
//! number of concurrent switch requests never interleave inside git.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{watch, Mutex};

use crate::config::Config;
use crate::git::GitCliRepository;
use crate::repository::SetupRepository;
use crate::setup::{short_branch_name, SetupRegistry};
use crate::{Error, Result};

/// Which branches become setups and where to fall back to
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    /// Branch names never exposed as setups
    pub ignore: HashSet<String>,
    /// Branches guaranteed to exist on the remote, in fallback order
    pub default_branches: Vec<String>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            ignore: HashSet::new(),
            default_branches: vec!["main".to_string(), "master".to_string()],
        }
    }
}

impl WorkspaceSettings {
    /// Settings taken from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            ignore: config.setups.ignore.iter().cloned().collect(),
            default_branches: config.repository.default_branches.clone(),
        }
    }

    fn is_default_branch(&self, name: &str) -> bool {
        self.default_branches.iter().any(|b| b == name)
    }
}

/// Owner of the repository handle and the lock around it
pub struct SetupWorkspace {
    repo: Mutex<Box<dyn SetupRepository>>,
    settings: WorkspaceSettings,
    active: watch::Sender<Option<String>>,
    /// Bumped every time the repository handle is replaced
    generation: AtomicU64,
}

impl std::fmt::Debug for SetupWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupWorkspace")
            .field("settings", &self.settings)
            .field("active", &*self.active.borrow())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SetupWorkspace {
    /// Wrap a repository handle
    pub fn new(repo: Box<dyn SetupRepository>, settings: WorkspaceSettings) -> Self {
        let active = match repo.active_branch() {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the checked-out branch");
                None
            }
        };

        Self {
            repo: Mutex::new(repo),
            settings,
            active: watch::Sender::new(active),
            generation: AtomicU64::new(0),
        }
    }

    /// Open the configured clone with the git backend
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let repo = GitCliRepository::from_config(config)?;
        Ok(Self::new(Box::new(repo), WorkspaceSettings::from_config(config)))
    }

    /// Last known checked-out branch
    ///
    /// Does not take the repository lock, so it may lag behind a checkout
    /// that is still in flight.
    pub fn active(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    /// Watch the checked-out branch
    pub fn subscribe_active(&self) -> watch::Receiver<Option<String>> {
        self.active.subscribe()
    }

    /// Consistent view of the active branch and the current registry
    ///
    /// Takes the lock but does not touch the remote.
    pub async fn snapshot(&self) -> Result<(Option<String>, SetupRegistry)> {
        let repo = self.repo.lock().await;
        let active = repo.active_branch()?;
        let registry = self.registry_locked(repo.as_ref())?;
        Ok((active, registry))
    }

    /// Swap in a different clone
    ///
    /// Pollers notice the swap and report the new clone's registry on their
    /// next tick even if it equals the old one.
    pub async fn replace_repository(&self, repo: Box<dyn SetupRepository>) {
        let mut guard = self.repo.lock().await;
        tracing::info!(
            old = %guard.root().display(),
            new = %repo.root().display(),
            "Replacing repository"
        );
        *guard = repo;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.publish_active(guard.as_ref());
    }

    /// Make `name` the checked-out setup
    pub async fn load(&self, name: &str) -> Result<()> {
        self.load_with(name, |_| {}).await
    }

    /// Make `name` the checked-out setup, then call `on_loaded(name)`
    ///
    /// Waits for any poll cycle or other switch in progress. Returns
    /// [`Error::SetupNotFound`] without touching the working tree when no
    /// remote branch has that name; `on_loaded` only runs on success.
    pub async fn load_with<F>(&self, name: &str, on_loaded: F) -> Result<()>
    where
        F: FnOnce(&str) + Send,
    {
        let mut repo = self.repo.lock().await;
        let result = self.load_locked(repo.as_mut(), name).await;
        self.publish_active(repo.as_ref());

        if result.is_ok() {
            on_loaded(name);
        }
        result
    }

    /// One poll cycle; returns the registry and the handle generation it came from
    pub(crate) async fn refresh(&self) -> Result<(u64, SetupRegistry)> {
        let mut repo = self.repo.lock().await;
        let generation = self.generation.load(Ordering::SeqCst);
        let result = self.refresh_locked(repo.as_mut()).await;
        self.publish_active(repo.as_ref());
        result.map(|registry| (generation, registry))
    }

    async fn refresh_locked(&self, repo: &mut dyn SetupRepository) -> Result<SetupRegistry> {
        repo.prune().await?;

        match repo.pull().await {
            Ok(()) => {}
            Err(Error::UpstreamGone { branch }) => {
                tracing::warn!(
                    branch = %branch,
                    "Active setup was deleted on the remote, falling back to a default branch"
                );
                self.fall_back_to_default(repo).await?;
                // the failed pull never fetched; catch up before listing
                repo.pull().await?;
            }
            Err(e) => return Err(e),
        }

        let registry = self.registry_locked(repo)?;

        if let Some(active) = repo.active_branch()? {
            if self.settings.is_default_branch(&active) {
                if let Some(setup) = registry.first_excluding(&self.settings.default_branches) {
                    let name = setup.name().to_string();
                    tracing::info!(from = %active, to = %name, "Leaving default branch");
                    self.load_locked(repo, &name).await?;
                }
            }
        }

        Ok(registry)
    }

    async fn fall_back_to_default(&self, repo: &mut dyn SetupRepository) -> Result<()> {
        let remote = repo.remote().to_string();
        let available = repo.remote_branches()?;

        let target = self
            .settings
            .default_branches
            .iter()
            .find(|default| {
                available
                    .iter()
                    .any(|b| short_branch_name(&remote, b) == Some(default.as_str()))
            })
            .cloned()
            .ok_or_else(|| {
                Error::Other(format!(
                    "None of the default branches ({}) exist on '{}'",
                    self.settings.default_branches.join(", "),
                    remote
                ))
            })?;

        self.load_locked(repo, &target).await
    }

    /// Switch while the caller already holds the lock
    ///
    /// Matching ignores the ignore-set so default branches stay reachable.
    async fn load_locked(&self, repo: &mut dyn SetupRepository, name: &str) -> Result<()> {
        repo.prune().await?;

        let remote = repo.remote().to_string();
        let found = repo
            .remote_branches()?
            .iter()
            .any(|b| short_branch_name(&remote, b) == Some(name));

        if !found {
            return Err(Error::SetupNotFound(name.to_string()));
        }

        repo.checkout(name).await?;
        tracing::info!(setup = %name, "Setup loaded");
        Ok(())
    }

    fn registry_locked(&self, repo: &dyn SetupRepository) -> Result<SetupRegistry> {
        let branches = repo.remote_branches()?;
        Ok(SetupRegistry::from_remote_branches(
            repo.remote(),
            branches,
            &self.settings.ignore,
        ))
    }

    fn publish_active(&self, repo: &dyn SetupRepository) {
        match repo.active_branch() {
            Ok(active) => {
                self.active.send_if_modified(|current| {
                    if *current == active {
                        false
                    } else {
                        *current = active;
                        true
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "Could not read the checked-out branch"),
        }
    }
}
