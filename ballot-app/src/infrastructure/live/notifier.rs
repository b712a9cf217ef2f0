use crate::domain::LiveEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of lifecycle events to live observers.
///
/// Publishing never blocks and never fails: with no observers the event is dropped, and an
/// observer that falls more than `CHANNEL_CAPACITY` events behind skips ahead.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<LiveEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: LiveEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(observers) => tracing::debug!("Published {} to {} observers", name, observers),
            Err(_) => tracing::debug!("Dropped {}: no observers", name),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
