//! Audit trail writer.
//!
//! Stamps are buffered for the duration of one request and written once the
//! request's transaction has committed or rolled back.

use kts_core::{ActionResult, ActionType, HistoryStamp, MonotonicClock};
use kts_storage::Storage;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct HistoryRecorder {
    clock: MonotonicClock,
    pending: Vec<HistoryStamp>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after the newest stamp already in `storage`.
    pub fn resume<S: Storage + ?Sized>(storage: &S) -> Self {
        let mut recorder = Self::new();
        match storage.latest_history_timestamp() {
            Ok(Some(latest)) => recorder.clock.observe(latest),
            Ok(None) => {}
            Err(e) => warn!("history: could not read latest timestamp: {e}"),
        }
        recorder
    }

    pub fn record(
        &mut self,
        action_type: ActionType,
        result: ActionResult,
        item_id: Option<&str>,
        comment: Option<&str>,
    ) {
        let stamp = HistoryStamp {
            timestamp: self.clock.tick(),
            action_type,
            action_result: result,
            item_id: item_id.filter(|id| !id.is_empty()).map(str::to_string),
            comments: comment.map(str::to_string),
        };
        debug!("{stamp}");
        self.pending.push(stamp);
    }

    pub fn pending(&self) -> &[HistoryStamp] {
        &self.pending
    }

    /// Drops stamps recorded after `mark`, a previous `pending().len()`.
    pub fn rewind(&mut self, mark: usize) {
        self.pending.truncate(mark);
    }

    /// Writes buffered stamps. Failures are logged and dropped.
    pub fn flush<S: Storage + ?Sized>(&mut self, storage: &mut S) -> usize {
        let mut written = 0;
        for stamp in self.pending.drain(..) {
            match storage.append_history(&stamp) {
                Ok(()) => written += 1,
                Err(e) => warn!("history: dropped \"{stamp}\": {e}"),
            }
        }
        written
    }
}
