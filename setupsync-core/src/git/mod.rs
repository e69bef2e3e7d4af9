//! Git operations for setupsync
//!
//! Reads go through libgit2; anything that talks to the remote or rewrites
//! the working tree shells out to the `git` executable.

mod backend;
mod command;
mod repo;

pub use backend::GitCliRepository;
pub use command::{is_upstream_gone, run_git};
pub use repo::GitRepo;
