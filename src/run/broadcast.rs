// src/run/broadcast.rs

//! The per-run broadcast loop.

use tokio::io::AsyncReadExt;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::launcher::OutputStream;
use crate::types::RunStatus;

use super::format::Utf8Decoder;
use super::{Run, RunSettings};

/// Drive `run` until its output ends, fails or is cancelled.
///
/// 1. Wait for the first subscriber, the grace period, or cancellation.
/// 2. Read bounded chunks, format them, log and deliver them in read order.
/// 3. On EOF / read error / cancellation, deliver the terminal event once and
///    record the final status.
pub(crate) async fn broadcast_loop(run: Run, mut output: OutputStream, settings: RunSettings) {
    wait_for_audience(&run, &settings).await;

    let mut buf = vec![0u8; settings.read_chunk_size.max(1)];
    let mut decoder = Utf8Decoder::default();
    let formatter = settings.formatter;

    loop {
        if run.cancel_requested() {
            let tail = formatter.format(&decoder.finish());
            run.finish(&tail, RunStatus::Canceled);
            return;
        }

        match output.read(&mut buf).await {
            Ok(0) => {
                let tail = formatter.format(&decoder.finish());
                run.finish(&tail, RunStatus::Completed);
                return;
            }
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                if text.is_empty() {
                    continue;
                }
                let chunk = formatter.format(&text);
                trace!(run_id = %run.id(), bytes = n, "broadcasting chunk");
                run.publish(&chunk);
            }
            Err(err) => {
                warn!(run_id = %run.id(), error = %err, "reading run output failed");
                let mut text = decoder.finish();
                text.push_str(&err.to_string());
                run.finish(&formatter.format(&text), RunStatus::Failed);
                return;
            }
        }
    }
}

/// One-shot gate before the hot loop starts.
///
/// Output keeps accumulating in the pipe meanwhile, so nothing is lost.
async fn wait_for_audience(run: &Run, settings: &RunSettings) {
    tokio::select! {
        _ = run.shared.first_subscriber.notified() => {
            debug!(run_id = %run.id(), "first subscriber attached; starting broadcast");
        }
        _ = sleep(settings.grace_period) => {
            debug!(run_id = %run.id(), "no subscriber within grace period; starting broadcast");
        }
        _ = run.shared.cancel.cancelled() => {
            debug!(run_id = %run.id(), "cancelled before broadcast started");
        }
    }
}
