// ── Snapshot subscriptions ──
//
// Either await every publication with `changed`, or turn the subscription
// into a `Stream` of tick results. Reconfiguration publishes a reset
// snapshot with no refresh time; the tick stream drops those.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::RefreshState;

/// A subscription to states published by the coordinator.
pub struct SnapshotStream {
    receiver: watch::Receiver<Arc<RefreshState>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<RefreshState>>) -> Self {
        Self { receiver }
    }

    /// Wait for the next publication, resets included. Returns `None` once
    /// the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<RefreshState>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Results of refresh ticks published from now on.
    ///
    /// Publications that land between two polls collapse into the latest
    /// one, so a slow consumer sees the freshest tick rather than a backlog.
    pub fn refreshes(self) -> RefreshStream {
        RefreshStream {
            inner: WatchStream::from_changes(self.receiver),
        }
    }
}

/// Tick results as a `Stream`. See [`SnapshotStream::refreshes`].
pub struct RefreshStream {
    inner: WatchStream<Arc<RefreshState>>,
}

impl Stream for RefreshStream {
    type Item = Arc<RefreshState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(state) if state.snapshot.refreshed_at().is_none() => {}
                other => return Poll::Ready(other),
            }
        }
    }
}
