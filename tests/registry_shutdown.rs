mod common;
use crate::common::{ScriptedLauncher, fast_settings, init_tracing, with_timeout};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use webcli::errors::{Result, WebcliError};
use webcli::launcher::{ChunkSender, CombinedOutput, Launched, Launcher};
use webcli::registry::Registry;
use webcli::types::RunStatus;

/// Output that never ends, whatever the token says: models a child whose
/// pipes outlive the kill (e.g. a grandchild still holding them).
#[derive(Debug, Default)]
struct StubbornLauncher {
    senders: Arc<Mutex<Vec<ChunkSender>>>,
}

impl Launcher for StubbornLauncher {
    fn launch(&self, _args: &[String], _cancel: CancellationToken) -> Result<Launched> {
        let (tx, output) = CombinedOutput::channel(1);
        self.senders.lock().unwrap().push(tx);
        Ok(Launched {
            output: Box::new(output),
            input: None,
        })
    }
}

#[tokio::test]
async fn shutdown_cancels_every_active_run() {
    init_tracing();
    let registry = Registry::new(ScriptedLauncher::new().hang(), fast_settings());
    let a = registry.start(vec!["jobs/a".to_string()]).unwrap();
    let b = registry.start(vec!["jobs/b".to_string()]).unwrap();

    let remaining = with_timeout(registry.shutdown(Duration::from_secs(2))).await;

    assert_eq!(remaining, 0);
    for id in [a, b] {
        assert_eq!(registry.get(&id).unwrap().status(), RunStatus::Canceled);
    }
}

#[tokio::test]
async fn start_is_rejected_after_shutdown() {
    let registry = Registry::new(ScriptedLauncher::new(), fast_settings());
    with_timeout(registry.shutdown(Duration::from_millis(100))).await;

    let err = registry.start(vec!["jobs/late".to_string()]).unwrap_err();
    assert!(matches!(err, WebcliError::ShuttingDown));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn finished_runs_are_left_untouched() {
    let registry = Registry::new(ScriptedLauncher::new().output("ok\n"), fast_settings());
    let id = registry.start(vec!["jobs/ok".to_string()]).unwrap();
    let run = registry.get(&id).unwrap();
    with_timeout(run.wait()).await;

    assert_eq!(with_timeout(registry.shutdown(Duration::from_millis(100))).await, 0);
    assert_eq!(run.status(), RunStatus::Completed);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn shutdown_reports_runs_stuck_in_a_read() {
    let registry = Registry::new(StubbornLauncher::default(), fast_settings());
    let id = registry.start(vec!["jobs/stuck".to_string()]).unwrap();

    // Let the loop pass its gate and block in the read.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let remaining = with_timeout(registry.shutdown(Duration::from_millis(50))).await;

    assert_eq!(remaining, 1);
    assert_eq!(registry.get(&id).unwrap().status(), RunStatus::Running);
}
