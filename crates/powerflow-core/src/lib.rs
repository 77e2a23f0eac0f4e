// powerflow-core: Refresh engine between powerflow-api and consumers (CLI or any UI).

pub mod config;
pub mod coordinator;
pub mod error;
pub mod flow;
pub mod format;
pub mod model;
pub mod source;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, RefreshInterval, TlsVerification};
pub use coordinator::{Coordinator, SchedulerPhase, TickOutcome, TickReport};
pub use error::CoreError;
pub use flow::{BatteryDirection, FlowEdge, FlowNode, GridDirection, PowerFlowState};
pub use source::{EntityReading, EntityStateSource};
pub use store::SnapshotStore;
pub use stream::{RefreshStream, SnapshotStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ConnectionStatus, EntityConfig, EntityKind, EntityValue, RefreshState, UnitKind, ValueSnapshot,
};

// Connection settings come straight from the API crate.
pub use powerflow_api::{Connection, FailureKind};
