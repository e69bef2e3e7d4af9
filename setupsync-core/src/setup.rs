//! Setups and the registry of setups visible on the remote

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

/// Name of the symbolic ref every remote carries for its default branch
const REMOTE_HEAD: &str = "HEAD";

/// A remote branch exposed as a selectable setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Setup(String);

impl Setup {
    /// Create a setup from a short branch name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The short branch name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Setup {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Setup {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Strip `<remote>/` from a remote tracking branch name
///
/// Returns `None` for names of other remotes and for the remote's HEAD pointer.
pub fn short_branch_name<'a>(remote: &str, tracking: &'a str) -> Option<&'a str> {
    let name = tracking.strip_prefix(remote)?.strip_prefix('/')?;
    if name.is_empty() || name == REMOTE_HEAD {
        None
    } else {
        Some(name)
    }
}

/// Every setup currently visible on the remote, sorted by name
///
/// Always rebuilt from a full listing, never patched. The order does not
/// depend on how git happens to store the refs, so two registries are equal
/// exactly when they hold the same set of setups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SetupRegistry {
    setups: Vec<Setup>,
}

impl SetupRegistry {
    /// Build the registry from remote tracking branch names
    ///
    /// Drops other remotes, the remote HEAD pointer, ignored names and
    /// duplicates. The input order is irrelevant.
    pub fn from_remote_branches<I, S>(remote: &str, branches: I, ignore: &HashSet<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = BTreeSet::new();

        for branch in branches {
            if let Some(name) = short_branch_name(remote, branch.as_ref()) {
                if !ignore.contains(name) {
                    names.insert(name.to_string());
                }
            }
        }

        Self {
            setups: names.into_iter().map(Setup::new).collect(),
        }
    }

    /// Iterate over setups in name order
    pub fn iter(&self) -> impl Iterator<Item = &Setup> {
        self.setups.iter()
    }

    /// Setup names in name order
    pub fn names(&self) -> Vec<&str> {
        self.setups.iter().map(Setup::name).collect()
    }

    /// Whether a setup with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.setups.iter().any(|s| s == name)
    }

    /// The first setup whose name is not in `excluded`
    pub fn first_excluding(&self, excluded: &[String]) -> Option<&Setup> {
        self.setups
            .iter()
            .find(|s| !excluded.iter().any(|e| e == s.name()))
    }

    /// Number of setups
    pub fn len(&self) -> usize {
        self.setups.len()
    }

    /// Whether there are no setups
    pub fn is_empty(&self) -> bool {
        self.setups.is_empty()
    }
}

impl<'a> IntoIterator for &'a SetupRegistry {
    type Item = &'a Setup;
    type IntoIter = std::slice::Iter<'a, Setup>;

    fn into_iter(self) -> Self::IntoIter {
        self.setups.iter()
    }
}
