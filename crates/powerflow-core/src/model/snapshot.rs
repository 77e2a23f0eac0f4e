// ── Value snapshot ──
//
// One formatted value per entity kind, replaced wholesale on every tick.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::entity::EntityKind;
use crate::format::{FETCH_FAILED, UNAVAILABLE};

/// The value recorded for one kind in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityValue {
    /// Fetched and numeric.
    Available { value: f64, display: String },
    /// Not configured, not numeric, or no connection. Renders as `---`.
    Unavailable,
    /// The fetch for this kind failed this tick. Renders as `N/A`.
    FetchFailed,
}

impl EntityValue {
    pub fn display(&self) -> &str {
        match self {
            Self::Available { display, .. } => display,
            Self::Unavailable => UNAVAILABLE,
            Self::FetchFailed => FETCH_FAILED,
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            Self::Available { value, .. } => Some(*value),
            Self::Unavailable | Self::FetchFailed => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Available { .. })
    }
}

static UNAVAILABLE_VALUE: EntityValue = EntityValue::Unavailable;

/// Formatted values for every [`EntityKind`].
///
/// Always holds exactly one entry per kind; kinds that were skipped or
/// failed carry a sentinel rather than being absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSnapshot {
    values: BTreeMap<EntityKind, EntityValue>,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ValueSnapshot {
    /// All kinds unavailable. Used at startup and after reconfiguration.
    pub fn unavailable(generation: u64) -> Self {
        Self {
            values: EntityKind::all()
                .map(|k| (k, EntityValue::Unavailable))
                .collect(),
            generation,
            refreshed_at: None,
        }
    }

    /// Build a snapshot from the given entries; kinds not listed become
    /// [`EntityValue::Unavailable`].
    pub fn from_entries(
        generation: u64,
        refreshed_at: Option<DateTime<Utc>>,
        entries: impl IntoIterator<Item = (EntityKind, EntityValue)>,
    ) -> Self {
        let mut snapshot = Self::unavailable(generation);
        snapshot.values.extend(entries);
        snapshot.refreshed_at = refreshed_at;
        snapshot
    }

    pub fn get(&self, kind: EntityKind) -> &EntityValue {
        self.values.get(&kind).unwrap_or(&UNAVAILABLE_VALUE)
    }

    pub fn display(&self, kind: EntityKind) -> &str {
        self.get(kind).display()
    }

    pub fn numeric(&self, kind: EntityKind) -> Option<f64> {
        self.get(kind).numeric()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Iterate all kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &EntityValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// The user-selected subset, in selection order. Internal-only kinds
    /// and duplicates are dropped.
    pub fn displayed<'a>(
        &'a self,
        selection: &'a [EntityKind],
    ) -> impl Iterator<Item = (EntityKind, &'a EntityValue)> + 'a {
        selection
            .iter()
            .enumerate()
            .filter(|(i, k)| k.is_displayable() && !selection[..*i].contains(k))
            .map(|(_, k)| (*k, self.get(*k)))
    }

    /// `kind -> display string` view.
    pub fn display_map(&self) -> BTreeMap<EntityKind, String> {
        self.iter().map(|(k, v)| (k, v.display().to_owned())).collect()
    }
}

/// Overall health of the last refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// At least one entity fetched successfully.
    Connected,
    /// No usable configuration.
    Disconnected,
    /// A refresh was attempted and every entity failed.
    Error,
}

/// Snapshot and status, published together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshState {
    pub snapshot: ValueSnapshot,
    pub status: ConnectionStatus,
}

impl RefreshState {
    pub fn initial(generation: u64) -> Self {
        Self {
            snapshot: ValueSnapshot::unavailable(generation),
            status: ConnectionStatus::Disconnected,
        }
    }
}
