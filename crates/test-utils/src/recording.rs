use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Collects every delivery made to it, for later assertions.
///
/// Hand [`RecordingListener::listener`] to `subscribe`; clones share the
/// same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    deliveries: Arc<Mutex<Vec<(String, bool)>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener(&self) -> impl Fn(&str, bool) + Send + Sync + 'static {
        let deliveries = Arc::clone(&self.deliveries);
        move |chunk: &str, terminal: bool| {
            deliveries
                .lock()
                .unwrap()
                .push((chunk.to_string(), terminal));
        }
    }

    /// `(chunk, terminal)` pairs in delivery order.
    pub fn deliveries(&self) -> Vec<(String, bool)> {
        self.deliveries.lock().unwrap().clone()
    }

    /// All delivered chunks concatenated.
    pub fn text(&self) -> String {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(chunk, _)| chunk.as_str())
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, terminal)| *terminal)
            .count()
    }

    /// Poll until the terminal delivery arrives. Combine with `with_timeout`.
    pub async fn terminated(&self) {
        while self.terminal_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
