//! Git repository detection and reference inspection

use std::path::{Path, PathBuf};

use git2::{BranchType, Repository};

use crate::{Error, Result};

/// A git repository wrapper for reading branches and HEAD
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the repository root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open a git repository at the given path
    ///
    /// This will search upward from the given path to find the repository root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Config(format!(
                    "Not a git repository: {}. Clone the setup repository there first.",
                    path.display()
                ))
            } else {
                Error::Git(e)
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::Config("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that a remote with this name is configured
    pub fn has_remote(&self, name: &str) -> bool {
        self.repo.find_remote(name).is_ok()
    }

    /// Get the current branch name
    ///
    /// Returns `None` for a detached or unborn HEAD.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(e)),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// List remote tracking branches of one remote
    ///
    /// Names keep their remote prefix (`origin/feature-a`, `origin/HEAD`).
    /// libgit2 lists loose refs before packed ones, so the order says nothing
    /// about the remote.
    pub fn list_remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", remote);
        let mut branches = Vec::new();

        for branch in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name().ok().flatten() {
                if name.starts_with(&prefix) {
                    branches.push(name.to_string());
                }
            }
        }

        Ok(branches)
    }

    /// Whether `refs/remotes/<remote>/<branch>` exists
    pub fn has_remote_branch(&self, remote: &str, branch: &str) -> bool {
        self.repo
            .find_reference(&format!("refs/remotes/{}/{}", remote, branch))
            .is_ok()
    }
}
