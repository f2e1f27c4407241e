// src/stream.rs

//! Live delivery as a text event stream.
//!
//! Each record is either `event: log` carrying a chunk, or `event: close`
//! with an empty payload, after which nothing follows. Records end with a
//! blank line, as in the standard `text/event-stream` framing.

use std::fmt;

use tokio::sync::mpsc;

use crate::run::Run;
use crate::types::SubscriberId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Log(String),
    Close,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Log(_) => "log",
            Event::Close => "close",
        }
    }

    /// Render the record, including its terminating blank line.
    ///
    /// Payloads containing newlines are split over several `data:` lines so
    /// they cannot break the framing.
    pub fn encode(&self) -> String {
        let data = match self {
            Event::Log(text) => text.as_str(),
            Event::Close => "",
        };

        let mut out = format!("event: {}\n", self.name());
        for line in data.split('\n') {
            out.push_str("data: ");
            out.push_str(line.trim_end_matches('\r'));
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Pull-based view of one subscription.
///
/// The run's listener only pushes into an unbounded channel, so a slow
/// consumer (e.g. a stalled HTTP client) never holds up the run's broadcast
/// loop; undelivered chunks queue up in memory instead.
///
/// Yields log events in read order, then exactly one [`Event::Close`], then
/// `None`. Dropping the stream unsubscribes it.
#[derive(Debug)]
pub struct EventStream {
    run: Run,
    subscriber: SubscriberId,
    rx: mpsc::UnboundedReceiver<Event>,
    backlog: String,
    pending_close: bool,
    done: bool,
}

impl EventStream {
    pub fn attach(run: Run, subscriber: impl Into<SubscriberId>) -> Self {
        let subscriber = subscriber.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let attach = run.subscribe(subscriber.clone(), move |chunk: &str, terminal: bool| {
            if !chunk.is_empty() {
                let _ = tx.send(Event::Log(chunk.to_string()));
            }
            if terminal {
                let _ = tx.send(Event::Close);
            }
        });

        Self {
            run,
            subscriber,
            rx,
            backlog: attach.backlog,
            pending_close: attach.finished,
            done: false,
        }
    }

    pub fn run_id(&self) -> &str {
        self.run.id()
    }

    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// Log content produced before this stream attached.
    pub fn backlog(&self) -> &str {
        &self.backlog
    }

    pub async fn next(&mut self) -> Option<Event> {
        if self.done {
            return None;
        }
        if self.pending_close {
            self.pending_close = false;
            self.done = true;
            return Some(Event::Close);
        }

        match self.rx.recv().await {
            Some(Event::Close) | None => {
                // `None` means the listener was removed from outside; close
                // anyway so consumers don't wait forever.
                self.done = true;
                Some(Event::Close)
            }
            Some(event) => Some(event),
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.run.unsubscribe(&self.subscriber);
    }
}
