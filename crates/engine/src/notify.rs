use tokio::sync::broadcast;
use tracing::debug;

use crate::request::ResourceKind;

/// "Data changed" signal; observers re-query on receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub channel: String,
    pub kinds: Vec<ResourceKind>,
}

/// Broadcasts change events to any number of observers.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    channel: String,
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(channel: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            channel: channel.into(),
            tx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Sends one event covering `kinds`. Having no observers is fine.
    pub fn notify(&self, kinds: Vec<ResourceKind>) {
        let event = ChangeEvent {
            channel: self.channel.clone(),
            kinds,
        };
        if let Ok(count) = self.tx.send(event) {
            debug!("change notification sent to {count} observers");
        }
    }
}
