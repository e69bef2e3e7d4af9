//! Running the `git` executable with a timeout

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::{Error, Result};

/// Stderr fragments git prints when the upstream of the current branch is gone
const UPSTREAM_GONE_MARKERS: &[&str] = &[
    "no such ref was fetched",
    "couldn't find remote ref",
    "upstream is gone",
];

/// Run `git <args>` in `workdir`, returning trimmed stdout
///
/// The child is killed if it does not finish within `timeout`.
pub async fn run_git(workdir: &Path, args: &[&str], timeout: Duration) -> Result<String> {
    let command = format!("git {}", args.join(" "));
    tracing::debug!(command = %command, workdir = %workdir.display(), "Running git");

    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(workdir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config("git executable not found in PATH. Is git installed?".to_string())
            } else {
                Error::Io(e)
            }
        })?,
        Err(_) => {
            return Err(Error::Timeout {
                command,
                after: timeout,
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::Command { command, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether a failed pull's stderr says the upstream branch no longer exists
pub fn is_upstream_gone(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    UPSTREAM_GONE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
}
