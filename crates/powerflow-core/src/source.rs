// ── Entity state source ──
//
// The seam between the coordinator and the HTTP client. The coordinator
// only talks to `dyn EntityStateSource`, so tests and alternative
// transports can stand in for `StateClient`.

use async_trait::async_trait;
use powerflow_api::{Connection, EntityState, StateClient};

use crate::model::EntityKind;

#[async_trait]
pub trait EntityStateSource: Send + Sync {
    /// Fetch the current state of `entity_id`.
    async fn fetch_state(
        &self,
        connection: &Connection,
        entity_id: &str,
    ) -> Result<EntityState, powerflow_api::Error>;

    /// Probe the API root.
    async fn ping(&self, connection: &Connection) -> Result<String, powerflow_api::Error>;
}

#[async_trait]
impl EntityStateSource for StateClient {
    async fn fetch_state(
        &self,
        connection: &Connection,
        entity_id: &str,
    ) -> Result<EntityState, powerflow_api::Error> {
        self.get_state(connection, entity_id).await
    }

    async fn ping(&self, connection: &Connection) -> Result<String, powerflow_api::Error> {
        StateClient::ping(self, connection).await
    }
}

/// Raw outcome of fetching one entity during a tick.
#[derive(Debug)]
pub struct EntityReading {
    pub kind: EntityKind,
    pub identifier: String,
    pub outcome: Result<EntityState, powerflow_api::Error>,
}
