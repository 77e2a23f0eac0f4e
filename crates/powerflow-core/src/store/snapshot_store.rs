// ── Latest refresh state ──
//
// Snapshot and connection status live together in one `watch` channel so
// readers never observe a snapshot paired with a stale status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{ConnectionStatus, RefreshState, ValueSnapshot};
use crate::stream::SnapshotStream;

pub struct SnapshotStore {
    state: watch::Sender<Arc<RefreshState>>,
    last_success: watch::Sender<Option<DateTime<Utc>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(RefreshState::initial(0)));
        let (last_success, _) = watch::channel(None);
        Self {
            state,
            last_success,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn current(&self) -> Arc<RefreshState> {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> ValueSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.borrow().status
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().snapshot.generation()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.state.subscribe())
    }

    /// Time of the last tick that reached at least one entity.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.borrow()
    }

    /// How long ago the last successful tick happened, or `None` if there
    /// has not been one since the last reset.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_success().map(|t| Utc::now() - t)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Publish a tick result. Results from an older generation than the one
    /// currently held are dropped; returns whether subscribers were notified.
    pub(crate) fn publish(&self, next: RefreshState) -> bool {
        let generation = next.snapshot.generation();
        let refreshed_at = next.snapshot.refreshed_at();
        let connected = next.status == ConnectionStatus::Connected;

        let published = self.state.send_if_modified(|current| {
            if generation < current.snapshot.generation() {
                return false;
            }
            *current = Arc::new(next);
            true
        });

        if published && connected {
            self.last_success
                .send_replace(Some(refreshed_at.unwrap_or_else(Utc::now)));
        }
        published
    }

    /// Replace everything with the all-unavailable state for `generation`.
    pub(crate) fn reset(&self, generation: u64) {
        self.state.send_replace(Arc::new(RefreshState::initial(generation)));
        self.last_success.send_replace(None);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
