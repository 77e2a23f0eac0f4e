// ── Snapshot store ──
//
// Single-writer, multi-reader holder for the latest refresh result, with
// push-based change notification.

mod snapshot_store;

pub use snapshot_store::SnapshotStore;
