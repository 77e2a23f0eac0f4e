// ── Domain model ──
//
// The fixed set of sensor kinds the engine tracks, their configuration,
// and the snapshot of formatted values produced by each refresh tick.

pub mod entity;
pub mod snapshot;

// ── Re-exports ──────────────────────────────────────────────────────

pub use entity::{EntityConfig, EntityKind, UnitKind};
pub use snapshot::{ConnectionStatus, EntityValue, RefreshState, ValueSnapshot};
