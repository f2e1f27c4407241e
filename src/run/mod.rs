// src/run/mod.rs

//! Process supervision for a single run.
//!
//! A [`Run`] owns one launched process. Its broadcast loop (see
//! [`broadcast`]) reads the combined output, appends it to the run's log and
//! pushes every chunk to the registered listeners.
//!
//! Locking: one `Mutex` per run guards the log, the subscription table and
//! the end time. Status transitions also happen under it, which is what makes
//! "no delivery after the terminal event" hold for late subscribers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SupervisorSettings;
use crate::errors::{Result, WebcliError};
use crate::launcher::{InputStream, Launcher};
use crate::types::{RunId, RunStatus, SubscriberId};

pub mod broadcast;
pub mod format;
pub mod subscribers;

pub use format::{ChunkFormatter, LineBreaks, Verbatim};
pub use subscribers::Listener;

use subscribers::Subscribers;

/// Knobs for a run's broadcast loop.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// How long the loop waits for a first subscriber before reading anyway.
    pub grace_period: Duration,
    /// Upper bound on bytes read per chunk.
    pub read_chunk_size: usize,
    pub formatter: Arc<dyn ChunkFormatter>,
}

impl RunSettings {
    pub fn from_config(settings: &SupervisorSettings) -> Self {
        Self {
            grace_period: settings.grace_period,
            read_chunk_size: settings.read_chunk_size,
            formatter: Arc::new(LineBreaks::new(settings.line_break.clone())),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&SupervisorSettings::default())
    }
}

/// Display data for a run, as shown in run listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub id: RunId,
    pub command: String,
    pub args: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
}

/// Result of [`Run::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attach {
    /// The log as it was at the moment of registration. Every later chunk is
    /// delivered to the listener, so `backlog` + deliveries has no gaps.
    pub backlog: String,
    /// The run had already ended; the listener was not registered and will
    /// never be called.
    pub finished: bool,
}

#[derive(Debug, Default)]
struct RunState {
    log: String,
    subscribers: Subscribers,
    ended_at: Option<DateTime<Utc>>,
    gate_released: bool,
}

struct RunShared {
    id: RunId,
    command: String,
    args: Vec<String>,
    started_at: DateTime<Utc>,
    state: Mutex<RunState>,
    status: watch::Sender<RunStatus>,
    first_subscriber: Notify,
    cancel: CancellationToken,
    input: Mutex<Option<InputStream>>,
}

/// Handle to one supervised child process.
///
/// Cloning is cheap; all clones refer to the same run.
#[derive(Clone)]
pub struct Run {
    shared: Arc<RunShared>,
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("id", &self.shared.id)
            .field("command", &self.shared.command)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Run {
    /// Launch the process for `args` and start its broadcast loop.
    ///
    /// The first argument is the slash-qualified command path; it is split
    /// into separate arguments before launching (`jobs/tick` → `jobs tick`).
    /// Returns as soon as the process is spawned.
    pub fn spawn(
        id: RunId,
        args: Vec<String>,
        launcher: &dyn Launcher,
        settings: &RunSettings,
        cancel: CancellationToken,
    ) -> Result<Run> {
        let Some((command, rest)) = args.split_first() else {
            return Err(WebcliError::InvalidArguments(
                "no command provided".to_string(),
            ));
        };

        let argv: Vec<String> = command
            .split('/')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .chain(rest.iter().cloned())
            .collect();

        let started_at = Utc::now();
        let launched = launcher.launch(&argv, cancel.clone())?;

        let (status, _) = watch::channel(RunStatus::Running);
        let run = Run {
            shared: Arc::new(RunShared {
                id,
                command: command.clone(),
                args: rest.to_vec(),
                started_at,
                state: Mutex::new(RunState::default()),
                status,
                first_subscriber: Notify::new(),
                cancel,
                input: Mutex::new(launched.input),
            }),
        };

        info!(run_id = %run.id(), command = %run.command(), "run started");

        tokio::spawn(broadcast::broadcast_loop(
            run.clone(),
            launched.output,
            settings.clone(),
        ));

        Ok(run)
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// The invoked command path (first argument).
    pub fn command(&self) -> &str {
        &self.shared.command
    }

    /// Remaining arguments, as rendered for the command.
    pub fn args(&self) -> &[String] {
        &self.shared.args
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.shared.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.lock_state().ended_at
    }

    pub fn status(&self) -> RunStatus {
        *self.shared.status.borrow()
    }

    /// Snapshot of everything logged so far. Frozen once the run has ended.
    pub fn logs(&self) -> String {
        self.lock_state().log.clone()
    }

    pub fn summary(&self) -> RunSummary {
        let ended_at = self.ended_at();
        RunSummary {
            id: self.shared.id.clone(),
            command: self.shared.command.clone(),
            args: self.shared.args.clone(),
            started_at: self.shared.started_at,
            ended_at,
            status: self.status(),
        }
    }

    /// Register `listener` under `subscriber`, replacing any listener with the
    /// same id.
    ///
    /// The first subscription ever made to a run releases its start-up gate.
    pub fn subscribe<L>(&self, subscriber: impl Into<SubscriberId>, listener: L) -> Attach
    where
        L: Listener + 'static,
    {
        let subscriber = subscriber.into();
        let mut state = self.lock_state();
        let backlog = state.log.clone();

        if self.status().is_terminal() {
            debug!(run_id = %self.id(), %subscriber, "subscribe after run ended; not registering");
            return Attach {
                backlog,
                finished: true,
            };
        }

        state.subscribers.insert(subscriber.clone(), Box::new(listener));
        if !state.gate_released {
            state.gate_released = true;
            self.shared.first_subscriber.notify_one();
        }
        debug!(run_id = %self.id(), %subscriber, "subscriber attached");

        Attach {
            backlog,
            finished: false,
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, subscriber: &str) -> bool {
        let removed = self.lock_state().subscribers.remove(subscriber);
        if removed {
            debug!(run_id = %self.id(), %subscriber, "subscriber detached");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_state().subscribers.len()
    }

    /// Request cancellation: the process is killed and the run ends as
    /// `Canceled`. Returns false (and does nothing) if the run already ended.
    pub fn cancel(&self) -> bool {
        // Hold the lock so the check and the request are atomic with respect
        // to the loop committing a terminal status.
        let _state = self.lock_state();
        if self.status().is_terminal() {
            debug!(run_id = %self.id(), "cancel on finished run ignored");
            return false;
        }
        self.shared.cancel.cancel();
        info!(run_id = %self.id(), "run cancellation requested");
        true
    }

    /// Wait until the run reaches its terminal status.
    pub async fn wait(&self) -> RunStatus {
        let mut rx = self.shared.status.subscribe();
        match rx.wait_for(|status| status.is_terminal()).await {
            Ok(status) => *status,
            // The sender lives as long as `self`; kept for completeness.
            Err(_) => self.status(),
        }
    }

    /// Take the child's stdin. Only the first caller gets it.
    pub fn take_input(&self) -> Option<InputStream> {
        self.shared
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        // Listener panics are caught in `Subscribers::broadcast`; this only
        // guards against poisoning from anything else.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_requested(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Append a chunk and deliver it to current subscribers.
    fn publish(&self, chunk: &str) {
        let mut state = self.lock_state();
        state.log.push_str(chunk);
        state.subscribers.broadcast(chunk, false);
    }

    /// Append the final chunk, deliver the terminal event and freeze the run.
    ///
    /// A pending cancellation overrides `outcome`.
    fn finish(&self, chunk: &str, outcome: RunStatus) -> RunStatus {
        let mut state = self.lock_state();
        let status = if self.cancel_requested() {
            RunStatus::Canceled
        } else {
            outcome
        };

        state.log.push_str(chunk);
        state.subscribers.broadcast(chunk, true);
        state.subscribers.clear();
        state.ended_at = Some(Utc::now());
        self.shared.status.send_replace(status);

        info!(
            run_id = %self.id(),
            command = %self.command(),
            %status,
            log_bytes = state.log.len(),
            "run finished"
        );
        status
    }
}
