// src/registry/mod.rs

//! The server-lifetime table of runs.
//!
//! The registry's lock only guards the id → [`Run`] map. Every operation on a
//! run looks the handle up, releases the registry lock, and then works on the
//! run under the run's own lock, so one busy run never blocks listing or
//! starting others.
//!
//! Runs are never evicted: finished runs stay listed with their logs until
//! the registry is dropped.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::errors::{Result, WebcliError};
use crate::launcher::{Launcher, ProcessLauncher};
use crate::run::{Attach, Listener, Run, RunSettings, RunSummary};
use crate::stream::EventStream;
use crate::types::RunId;

pub mod ids;

pub use ids::{RunIdGenerator, SubscriberIdGenerator};

use ids::run_sequence;

/// Owns every run started through it.
#[derive(Debug)]
pub struct Registry {
    runs: Mutex<HashMap<RunId, Run>>,
    launcher: Arc<dyn Launcher>,
    settings: RunSettings,
    shutdown: CancellationToken,
    run_ids: RunIdGenerator,
    subscriber_ids: SubscriberIdGenerator,
}

impl Registry {
    pub fn new(launcher: impl Launcher + 'static, settings: RunSettings) -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            launcher: Arc::new(launcher),
            settings,
            shutdown: CancellationToken::new(),
            run_ids: RunIdGenerator::default(),
            subscriber_ids: SubscriberIdGenerator::default(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            ProcessLauncher::from_config(&cfg.launcher),
            RunSettings::from_config(&cfg.supervisor),
        )
    }

    /// Launch a new run and return its id without waiting for it to progress.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, args: Vec<String>) -> Result<RunId> {
        if args.is_empty() {
            return Err(WebcliError::InvalidArguments(
                "no command provided".to_string(),
            ));
        }
        if self.shutdown.is_cancelled() {
            return Err(WebcliError::ShuttingDown);
        }

        let id = self.run_ids.next_id();
        let run = Run::spawn(
            id.clone(),
            args,
            self.launcher.as_ref(),
            &self.settings,
            self.shutdown.child_token(),
        )?;

        self.lock_runs().insert(id.clone(), run);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<Run> {
        self.lock_runs().get(id).cloned()
    }

    /// Summaries of every known run, oldest first.
    pub fn list(&self) -> Vec<RunSummary> {
        let runs: Vec<Run> = self.lock_runs().values().cloned().collect();
        let mut summaries: Vec<RunSummary> = runs.iter().map(Run::summary).collect();
        summaries.sort_by(start_order);
        summaries
    }

    pub fn len(&self) -> usize {
        self.lock_runs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe<L>(&self, id: &str, subscriber: &str, listener: L) -> Result<Attach>
    where
        L: Listener + 'static,
    {
        Ok(self.lookup(id)?.subscribe(subscriber, listener))
    }

    pub fn unsubscribe(&self, id: &str, subscriber: &str) -> Result<bool> {
        Ok(self.lookup(id)?.unsubscribe(subscriber))
    }

    /// Cancel a run. `Ok(false)` means it had already finished.
    pub fn cancel(&self, id: &str) -> Result<bool> {
        Ok(self.lookup(id)?.cancel())
    }

    pub fn logs(&self, id: &str) -> Result<String> {
        Ok(self.lookup(id)?.logs())
    }

    /// Attach a new event stream to a run under a generated subscriber id.
    pub fn stream(&self, id: &str) -> Result<EventStream> {
        let run = self.lookup(id)?;
        Ok(EventStream::attach(run, self.subscriber_ids.next_id()))
    }

    /// Cancel every run and wait up to `timeout` for their loops to finish.
    ///
    /// Returns how many runs were still active when the wait gave up. New
    /// `start` calls are rejected afterwards.
    pub async fn shutdown(&self, timeout: Duration) -> usize {
        self.shutdown.cancel();

        let runs: Vec<Run> = self.lock_runs().values().cloned().collect();
        let active: Vec<Run> = runs
            .into_iter()
            .filter(|run| !run.status().is_terminal())
            .collect();
        info!(active = active.len(), ?timeout, "shutting down runs");

        let wait_all = async {
            for run in &active {
                let status = run.wait().await;
                debug!(run_id = %run.id(), %status, "run wound down");
            }
        };

        if tokio::time::timeout(timeout, wait_all).await.is_ok() {
            info!("all runs finished");
            return 0;
        }

        let remaining = active
            .iter()
            .filter(|run| !run.status().is_terminal())
            .count();
        warn!(remaining, "shutdown timed out with runs still active");
        remaining
    }

    fn lookup(&self, id: &str) -> Result<Run> {
        self.get(id)
            .ok_or_else(|| WebcliError::RunNotFound(id.to_string()))
    }

    fn lock_runs(&self) -> MutexGuard<'_, HashMap<RunId, Run>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Start time, then the id's sequence number (so `-10` follows `-2`).
fn start_order(a: &RunSummary, b: &RunSummary) -> Ordering {
    a.started_at
        .cmp(&b.started_at)
        .then_with(|| run_sequence(&a.id).cmp(&run_sequence(&b.id)))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::RunStatus;

    fn summary(id: &str, started_at: chrono::DateTime<Utc>) -> RunSummary {
        RunSummary {
            id: id.to_string(),
            command: "jobs/tick".to_string(),
            args: Vec::new(),
            started_at,
            ended_at: None,
            status: RunStatus::Running,
        }
    }

    #[test]
    fn equal_start_times_order_by_sequence_number() {
        let now = Utc::now();
        let mut list = vec![
            summary("20260101-000000-000-10", now),
            summary("20260101-000000-000-2", now),
            summary("20260101-000000-000-1", now - chrono::Duration::milliseconds(1)),
        ];

        list.sort_by(start_order);

        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "20260101-000000-000-1",
                "20260101-000000-000-2",
                "20260101-000000-000-10",
            ]
        );
    }
}
