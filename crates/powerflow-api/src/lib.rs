// powerflow-api: Async Rust client for the Home Assistant entity state API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{Connection, StateClient};
pub use error::{Error, FailureKind};
pub use models::EntityState;
pub use transport::{TlsMode, TransportConfig};
