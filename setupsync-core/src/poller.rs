//! Background polling of the remote for setup changes
//!
//! A [`SetupPoller`] runs one poll cycle (prune, pull, rebuild the registry)
//! every interval on its own tokio task and reports registry changes and
//! failures through the two callbacks given to [`SetupPoller::start`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::MIN_POLL_INTERVAL;
use crate::setup::SetupRegistry;
use crate::workspace::SetupWorkspace;
use crate::{Error, Result};

/// Periodic synchronizer for one [`SetupWorkspace`]
#[derive(Debug)]
pub struct SetupPoller {
    workspace: Arc<SetupWorkspace>,
    interval: Duration,
    /// Last registry handed to the caller
    reported: Option<SetupRegistry>,
    /// Repository generation `reported` belongs to
    generation: u64,
}

impl SetupPoller {
    /// Create a poller; nothing runs until [`start`](Self::start)
    pub fn new(workspace: Arc<SetupWorkspace>, interval: Duration) -> Self {
        Self {
            workspace,
            interval,
            reported: None,
            generation: 0,
        }
    }

    /// The workspace this poller refreshes
    pub fn workspace(&self) -> &Arc<SetupWorkspace> {
        &self.workspace
    }

    /// Run a single poll cycle now
    ///
    /// Returns the new registry when it differs from the last one returned,
    /// `None` when nothing changed.
    pub async fn poll_once(&mut self) -> Result<Option<SetupRegistry>> {
        let (generation, registry) = self.workspace.refresh().await?;

        if generation != self.generation {
            self.generation = generation;
            self.reported = None;
        }

        if self.reported.as_ref() == Some(&registry) {
            tracing::debug!(setups = registry.len(), "Setups unchanged");
            return Ok(None);
        }

        tracing::info!(setups = ?registry.names(), "Setups changed");
        self.reported = Some(registry.clone());
        Ok(Some(registry))
    }

    /// Spawn the polling loop
    ///
    /// `on_changed` receives every registry that differs from the previous
    /// one (the first successful cycle always counts as a change).
    /// `on_error` receives the diagnostic text of any failed cycle; the loop
    /// keeps running and retries on the next tick.
    pub fn start<C, E>(mut self, on_changed: C, on_error: E) -> PollerHandle
    where
        C: Fn(&SetupRegistry) + Send + 'static,
        E: Fn(String) + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (interval_tx, mut interval_rx) = watch::channel(self.interval);

        let task = tokio::spawn(async move {
            tracing::info!(
                interval = %humantime::format_duration(self.interval),
                "Setup poller started"
            );

            loop {
                match self.poll_once().await {
                    Ok(Some(registry)) => on_changed(&registry),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Poll cycle failed");
                        on_error(e.diagnostic());
                    }
                }

                if !self.wait_for_tick(&mut shutdown_rx, &mut interval_rx).await {
                    break;
                }
            }

            tracing::info!("Setup poller stopped");
        });

        PollerHandle {
            shutdown: shutdown_tx,
            interval: interval_tx,
            task,
        }
    }

    /// Sleep until the next tick; `false` once shutdown was requested
    async fn wait_for_tick(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
        interval: &mut watch::Receiver<Duration>,
    ) -> bool {
        let started = Instant::now();

        loop {
            if *shutdown.borrow_and_update() {
                return false;
            }

            tokio::select! {
                _ = tokio::time::sleep_until(started + self.interval) => return true,
                changed = shutdown.changed() => {
                    // dropped handle means shutdown
                    if changed.is_err() {
                        return false;
                    }
                }
                changed = interval.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    self.interval = *interval.borrow_and_update();
                    tracing::info!(
                        interval = %humantime::format_duration(self.interval),
                        "Poll interval updated"
                    );
                }
            }
        }
    }
}

/// Control handle for a running poller
///
/// Dropping the handle stops the poller at its next wait.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    interval: watch::Sender<Duration>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the poller to stop
    ///
    /// Takes effect immediately if the poller is waiting, otherwise after the
    /// cycle in progress finishes.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Change the poll interval; applies to the wait in progress
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        if interval < MIN_POLL_INTERVAL {
            return Err(Error::Config(format!(
                "Poll interval must be at least {}s",
                MIN_POLL_INTERVAL.as_secs()
            )));
        }
        self.interval.send_replace(interval);
        Ok(())
    }

    /// Wait for the polling task to exit
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::Other(format!("Poller task failed: {}", e)))
    }

    /// Stop the poller and wait for it to exit
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRemote;
    use crate::workspace::WorkspaceSettings;
    use tokio::sync::mpsc;

    fn poller(remote: &FakeRemote, interval: Duration) -> SetupPoller {
        let settings = WorkspaceSettings {
            ignore: ["main".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let workspace = Arc::new(SetupWorkspace::new(remote.repository(), settings));
        SetupPoller::new(workspace, interval)
    }

    #[tokio::test]
    async fn test_poll_once_reports_only_changes() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let mut poller = poller(&remote, MIN_POLL_INTERVAL);

        let first = poller.poll_once().await.unwrap();
        assert_eq!(first.unwrap().names(), vec!["feature-a"]);
        assert!(poller.poll_once().await.unwrap().is_none());

        remote.push_branch("feature-b");
        let changed = poller.poll_once().await.unwrap().unwrap();
        assert_eq!(changed.names(), vec!["feature-a", "feature-b"]);
        assert!(poller.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poll_once_ignores_ref_reordering() {
        let remote = FakeRemote::new(&["main", "feature-a", "feature-c"], Some("feature-a"));
        let mut poller = poller(&remote, MIN_POLL_INTERVAL);
        poller.poll_once().await.unwrap();

        // same refs, listed in a different order
        remote.reorder_refs();
        assert!(poller.poll_once().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poll_once_after_repository_swap() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let mut poller = poller(&remote, MIN_POLL_INTERVAL);
        poller.poll_once().await.unwrap();

        // same branches, different clone: still reported
        let clone = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        poller.workspace().replace_repository(clone.repository()).await;
        assert!(poller.poll_once().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_baseline() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let mut poller = poller(&remote, MIN_POLL_INTERVAL);
        poller.poll_once().await.unwrap();

        remote.fail_pulls(Some("fatal: Could not read from remote repository."));
        assert!(poller.poll_once().await.is_err());

        remote.fail_pulls(None);
        assert!(poller.poll_once().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reports_changes_and_errors() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let (changed_tx, mut changed_rx) = mpsc::unbounded_channel();
        let (error_tx, mut error_rx) = mpsc::unbounded_channel();

        let handle = poller(&remote, MIN_POLL_INTERVAL).start(
            move |registry| {
                let _ = changed_tx.send(registry.clone());
            },
            move |text| {
                let _ = error_tx.send(text);
            },
        );

        let first = changed_rx.recv().await.unwrap();
        assert_eq!(first.names(), vec!["feature-a"]);

        remote.fail_pulls(Some("fatal: unable to access 'https://example.com/setups.git/'"));
        let error = error_rx.recv().await.unwrap();
        assert!(error.contains("unable to access"));

        remote.fail_pulls(None);
        remote.push_branch("feature-b");
        let second = changed_rx.recv().await.unwrap();
        assert_eq!(second.names(), vec!["feature-a", "feature-b"]);

        handle.shutdown().await.unwrap();
        assert!(changed_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_switches_off_default_branch() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("main"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = poller(&remote, MIN_POLL_INTERVAL).start(
            move |registry| {
                let _ = tx.send(registry.clone());
            },
            |_| {},
        );

        let registry = rx.recv().await.unwrap();
        assert_eq!(registry.names(), vec!["feature-a"]);
        assert_eq!(remote.active().as_deref(), Some("feature-a"));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_wait() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = poller(&remote, Duration::from_secs(3600)).start(
            move |registry| {
                let _ = tx.send(registry.clone());
            },
            |_| {},
        );

        // first cycle done, poller is now waiting an hour
        rx.recv().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("poller did not stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_poller() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = poller(&remote, Duration::from_secs(3600)).start(
            move |registry| {
                let _ = tx.send(registry.clone());
            },
            |_| {},
        );
        rx.recv().await.unwrap();
        drop(handle);

        // the task owned the only sender, so the channel closes once it exits
        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(closed.expect("poller did not stop"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_interval() {
        let remote = FakeRemote::new(&["main", "feature-a"], Some("feature-a"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = poller(&remote, Duration::from_secs(3600)).start(
            move |registry| {
                let _ = tx.send(registry.clone());
            },
            |_| {},
        );
        rx.recv().await.unwrap();

        assert!(handle.set_interval(Duration::from_secs(5)).is_err());
        handle.set_interval(Duration::from_secs(10)).unwrap();

        remote.push_branch("feature-b");
        let started = Instant::now();
        let registry = rx.recv().await.unwrap();
        assert_eq!(registry.names(), vec!["feature-a", "feature-b"]);
        assert!(started.elapsed() < Duration::from_secs(3600));

        handle.shutdown().await.unwrap();
    }
}
