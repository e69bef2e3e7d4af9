//! Error types for setupsync

use std::time::Duration;

use thiserror::Error;

/// Result type alias for setupsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for setupsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// libgit2 error while reading references or HEAD
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// A git subprocess exited with a failure status
    #[error("`{command}` failed: {stderr}")]
    Command {
        /// The command line that was run
        command: String,
        /// Trimmed stderr of the process
        stderr: String,
    },

    /// A git subprocess did not finish within the configured timeout
    #[error("`{command}` timed out after {}", humantime::format_duration(*.after))]
    Timeout {
        /// The command line that was run
        command: String,
        /// How long we waited
        after: Duration,
    },

    /// Pull failed because the upstream of the checked-out branch was deleted
    #[error("Upstream of branch '{branch}' no longer exists on the remote")]
    UpstreamGone {
        /// The local branch whose upstream is missing
        branch: String,
    },

    /// No remote branch matches the requested setup name
    #[error("Setup not found: {0}")]
    SetupNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Render the error together with its full `source()` chain
    ///
    /// Used when an error crosses the callback boundary as plain text.
    pub fn diagnostic(&self) -> String {
        let mut text = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            text.push_str("\n  caused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}
