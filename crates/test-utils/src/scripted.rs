use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use webcli::errors::{Result, WebcliError};
use webcli::launcher::{ChunkSender, CombinedOutput, Launched, Launcher};

/// One step of a scripted process.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit raw bytes on the combined output.
    Bytes(Vec<u8>),
    /// Do nothing for a while.
    Pause(Duration),
    /// Make the next read fail with this message, then stop.
    Fail(String),
    /// Keep the output open until cancelled.
    Hang,
}

/// A fake launcher that:
/// - records every argument vector it was asked to launch
/// - plays a fixed script of output instead of spawning a process
///
/// Cancelling the token stops the script and closes the output, just like a
/// killed child closing its pipes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    steps: Vec<Step>,
    launched: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(self, text: &str) -> Self {
        self.bytes(text.as_bytes())
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.steps.push(Step::Bytes(bytes.to_vec()));
        self
    }

    pub fn pause(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Pause(duration));
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.steps.push(Step::Fail(message.to_string()));
        self
    }

    pub fn hang(mut self) -> Self {
        self.steps.push(Step::Hang);
        self
    }

    /// Argument vectors seen so far, in launch order.
    pub fn launched(&self) -> Vec<Vec<String>> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for ScriptedLauncher {
    fn launch(&self, args: &[String], cancel: CancellationToken) -> Result<Launched> {
        if args.is_empty() {
            return Err(WebcliError::InvalidArguments(
                "no command provided".to_string(),
            ));
        }
        self.launched.lock().unwrap().push(args.to_vec());

        let (tx, output) = CombinedOutput::channel(16);
        let steps = self.steps.clone();
        tokio::spawn(async move {
            for step in steps {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    keep_going = play(step, &tx) => {
                        if !keep_going {
                            return;
                        }
                    }
                }
            }
        });

        Ok(Launched {
            output: Box::new(output),
            input: None,
        })
    }
}

async fn play(step: Step, tx: &ChunkSender) -> bool {
    match step {
        Step::Bytes(bytes) => tx.send(Ok(bytes)).await.is_ok(),
        Step::Pause(duration) => {
            tokio::time::sleep(duration).await;
            true
        }
        Step::Fail(message) => {
            let _ = tx.send(Err(io::Error::other(message))).await;
            false
        }
        Step::Hang => std::future::pending().await,
    }
}
