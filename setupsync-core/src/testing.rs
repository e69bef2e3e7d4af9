//! In-memory repository used by the unit tests

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::repository::SetupRepository;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct FakeState {
    /// Branches that exist on the server
    server: Vec<String>,
    /// Local remote-tracking refs, short names
    tracking: Vec<String>,
    active: Option<String>,
    pull_error: Option<String>,
    in_flight: usize,
    max_in_flight: usize,
    checkouts: Vec<String>,
    /// Refs are listed newest first unless set, like loose against packed refs
    packed: bool,
}

/// Shared view of a fake clone and its server; clones share state
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRemote {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRemote {
    /// Server with `branches`, already fetched, with `active` checked out
    pub(crate) fn new(branches: &[&str], active: Option<&str>) -> Self {
        let branches: Vec<String> = branches.iter().map(|b| b.to_string()).collect();
        let remote = Self::default();
        {
            let mut state = remote.state.lock().unwrap();
            state.server = branches.clone();
            state.tracking = branches;
            state.active = active.map(str::to_string);
        }
        remote
    }

    pub(crate) fn repository(&self) -> Box<dyn SetupRepository> {
        Box::new(FakeRepository {
            root: PathBuf::from("/fake/setups"),
            remote: self.clone(),
        })
    }

    pub(crate) fn push_branch(&self, name: &str) {
        self.state.lock().unwrap().server.push(name.to_string());
    }

    pub(crate) fn delete_branch(&self, name: &str) {
        self.state.lock().unwrap().server.retain(|b| b != name);
    }

    /// List the same refs in a different order from now on
    pub(crate) fn reorder_refs(&self) {
        let mut state = self.state.lock().unwrap();
        state.packed = !state.packed;
    }

    pub(crate) fn fail_pulls(&self, message: Option<&str>) {
        self.state.lock().unwrap().pull_error = message.map(str::to_string);
    }

    pub(crate) fn active(&self) -> Option<String> {
        self.state.lock().unwrap().active.clone()
    }

    pub(crate) fn checkouts(&self) -> Vec<String> {
        self.state.lock().unwrap().checkouts.clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    /// Mark an operation as running across a yield point so overlapping
    /// callers show up in `max_in_flight`
    async fn enter(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }
        tokio::task::yield_now().await;
        self.state.lock().unwrap().in_flight -= 1;
    }
}

struct FakeRepository {
    root: PathBuf,
    remote: FakeRemote,
}

#[async_trait]
impl SetupRepository for FakeRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn remote(&self) -> &str {
        "origin"
    }

    async fn prune(&mut self) -> Result<()> {
        self.remote.enter().await;
        let mut state = self.remote.state.lock().unwrap();
        let server = state.server.clone();
        state.tracking.retain(|b| server.contains(b));
        Ok(())
    }

    async fn pull(&mut self) -> Result<()> {
        self.remote.enter().await;
        let mut state = self.remote.state.lock().unwrap();

        // a pruned upstream is reported before anything is fetched
        if let Some(active) = state.active.clone() {
            if !state.tracking.contains(&active) {
                return Err(Error::UpstreamGone { branch: active });
            }
        }

        if let Some(message) = state.pull_error.clone() {
            return Err(Error::Command {
                command: "git pull --ff-only".to_string(),
                stderr: message,
            });
        }

        state.tracking = state.server.clone();
        Ok(())
    }

    async fn checkout(&mut self, branch: &str) -> Result<()> {
        self.remote.enter().await;
        let mut state = self.remote.state.lock().unwrap();
        if !state.tracking.iter().any(|b| b == branch) {
            return Err(Error::Command {
                command: format!("git checkout {}", branch),
                stderr: format!("error: pathspec '{}' did not match", branch),
            });
        }
        state.active = Some(branch.to_string());
        state.checkouts.push(branch.to_string());
        Ok(())
    }

    fn remote_branches(&self) -> Result<Vec<String>> {
        let state = self.remote.state.lock().unwrap();
        let mut branches = vec!["origin/HEAD".to_string()];
        branches.extend(state.tracking.iter().map(|b| format!("origin/{}", b)));
        if !state.packed {
            branches.reverse();
        }
        Ok(branches)
    }

    fn active_branch(&self) -> Result<Option<String>> {
        Ok(self.remote.active())
    }
}
