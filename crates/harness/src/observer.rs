use kts_engine::{ChangeEvent, Provider};
use kts_storage::Storage;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// A set of independent change observers on one provider.
pub struct TestObservers {
    receivers: Vec<broadcast::Receiver<ChangeEvent>>,
}

impl Default for TestObservers {
    fn default() -> Self {
        Self::new()
    }
}

impl TestObservers {
    pub fn new() -> Self {
        Self {
            receivers: Vec::new(),
        }
    }

    pub fn attach<S: Storage>(&mut self, provider: &Provider<S>) -> usize {
        let index = self.receivers.len();
        self.receivers.push(provider.subscribe());
        index
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Events pending for observer `index`, consuming them.
    pub fn received(&mut self, index: usize) -> Vec<ChangeEvent> {
        drain(&mut self.receivers[index])
    }
}

/// Everything currently queued on `receiver`. Lag is skipped over.
pub fn drain(receiver: &mut broadcast::Receiver<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    events
}
