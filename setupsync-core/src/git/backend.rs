//! [`SetupRepository`] backed by libgit2 reads and the git executable

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use super::command::{is_upstream_gone, run_git};
use super::repo::GitRepo;
use crate::config::Config;
use crate::repository::SetupRepository;
use crate::{Error, Result};

/// Repository handle for a real clone on disk
///
/// Prune, pull and checkout go through the `git` binary so credentials
/// helpers and hooks behave exactly as on the command line.
#[derive(Debug)]
pub struct GitCliRepository {
    repo: GitRepo,
    remote: String,
    timeout: Duration,
}

impl GitCliRepository {
    /// Open the clone at `path`, tracking `remote`
    pub fn open(path: impl AsRef<Path>, remote: impl Into<String>) -> Result<Self> {
        let repo = GitRepo::open(path)?;
        let remote = remote.into();

        if !repo.has_remote(&remote) {
            return Err(Error::Config(format!(
                "Remote '{}' is not configured in {}",
                remote,
                repo.root().display()
            )));
        }

        Ok(Self {
            repo,
            remote,
            timeout: Duration::from_secs(120),
        })
    }

    /// Open the clone described by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config.repository_path()?;
        Ok(Self::open(path, config.repository.remote.clone())?
            .with_timeout(config.poll.command_timeout))
    }

    /// Set the upper bound for each git command
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // git2 handles are not Sync; nothing borrowed from them may cross an await
    fn invocation(&self) -> (PathBuf, Duration) {
        (self.repo.root().to_path_buf(), self.timeout)
    }
}

#[async_trait]
impl SetupRepository for GitCliRepository {
    fn root(&self) -> &Path {
        self.repo.root()
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    async fn prune(&mut self) -> Result<()> {
        let (root, timeout) = self.invocation();
        let remote = self.remote.clone();
        run_git(&root, &["remote", "prune", remote.as_str()], timeout).await?;
        Ok(())
    }

    async fn pull(&mut self) -> Result<()> {
        let branch = self.repo.current_branch()?;

        // After a prune the tracking ref is gone before pull even tries
        if let Some(ref branch) = branch {
            if !self.repo.has_remote_branch(&self.remote, branch) {
                return Err(Error::UpstreamGone {
                    branch: branch.clone(),
                });
            }
        }

        let (root, timeout) = self.invocation();
        match run_git(&root, &["pull", "--ff-only"], timeout).await {
            Ok(_) => Ok(()),
            Err(Error::Command { stderr, .. }) if is_upstream_gone(&stderr) => {
                Err(Error::UpstreamGone {
                    branch: branch.unwrap_or_default(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn checkout(&mut self, branch: &str) -> Result<()> {
        let (root, timeout) = self.invocation();
        // "--" keeps a setup named like a top-level path from reading as a pathspec
        run_git(&root, &["checkout", branch, "--"], timeout).await?;
        Ok(())
    }

    fn remote_branches(&self) -> Result<Vec<String>> {
        self.repo.list_remote_branches(&self.remote)
    }

    fn active_branch(&self) -> Result<Option<String>> {
        self.repo.current_branch()
    }
}
