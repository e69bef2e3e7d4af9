//! setupsync core - keep a local clone in sync with the setups on its remote
//!
//! A [`SetupPoller`] periodically prunes, pulls and recomputes the
//! [`SetupRegistry`] of a [`SetupWorkspace`], while callers switch setups
//! through [`SetupWorkspace::load`]. Both serialize on the workspace lock.

pub mod config;
pub mod error;
pub mod git;
pub mod poller;
pub mod repository;
pub mod setup;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use config::{Config, PollConfig, RepositoryConfig, SetupsConfig, MIN_POLL_INTERVAL};
pub use error::{Error, Result};
pub use git::{GitCliRepository, GitRepo};
pub use poller::{PollerHandle, SetupPoller};
pub use repository::SetupRepository;
pub use setup::{Setup, SetupRegistry};
pub use workspace::{SetupWorkspace, WorkspaceSettings};
