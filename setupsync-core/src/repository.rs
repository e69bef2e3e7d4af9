//! The repository handle shared by the poller and the switcher

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// Source-control operations the core needs from a local clone
///
/// Every mutating call is made while holding the workspace lock, so
/// implementations do not need their own synchronization.
#[async_trait]
pub trait SetupRepository: Send {
    /// Root of the working tree
    fn root(&self) -> &Path;

    /// Name of the single tracked remote (e.g. "origin")
    fn remote(&self) -> &str;

    /// Drop remote tracking refs whose branch was deleted on the remote
    async fn prune(&mut self) -> Result<()>;

    /// Fetch and merge the upstream of the checked-out branch
    ///
    /// Returns [`crate::Error::UpstreamGone`] when that upstream was deleted.
    async fn pull(&mut self) -> Result<()>;

    /// Check out a branch by its short name
    async fn checkout(&mut self, branch: &str) -> Result<()>;

    /// Remote tracking branches in any order, remote prefix included
    fn remote_branches(&self) -> Result<Vec<String>>;

    /// Short name of the checked-out branch, `None` when HEAD is detached
    fn active_branch(&self) -> Result<Option<String>>;
}
