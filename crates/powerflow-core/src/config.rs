// ── Runtime coordinator configuration ──
//
// Describes *what* to poll and *how* to reach Home Assistant. Never touches
// disk: `powerflow-config` (or any embedding app) builds a
// `CoordinatorConfig` and hands it in.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use powerflow_api::{Connection, TlsMode, TransportConfig};

use crate::model::{EntityConfig, EntityKind};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Period between scheduled refresh ticks, clamped to
/// [`MIN`](Self::MIN)..=[`MAX`](Self::MAX).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshInterval(Duration);

impl RefreshInterval {
    pub const MIN: Duration = Duration::from_secs(10);
    pub const MAX: Duration = Duration::from_secs(300);
    pub const DEFAULT: Duration = Duration::from_secs(30);

    /// Clamp `period` into the supported range.
    pub fn new(period: Duration) -> Self {
        Self(period.clamp(Self::MIN, Self::MAX))
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn get(self) -> Duration {
        self.0
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Everything the coordinator needs for one configuration generation.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Base URL and access token. Either may be absent.
    pub connection: Connection,
    /// Kind to Home Assistant entity id. Missing or blank entries are skipped.
    pub entities: BTreeMap<EntityKind, String>,
    pub refresh_interval: RefreshInterval,
    /// Kinds the presentation layer shows, in order.
    pub display: Vec<EntityKind>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connection: Connection::default(),
            entities: BTreeMap::new(),
            refresh_interval: RefreshInterval::default(),
            display: EntityKind::displayable().collect(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl CoordinatorConfig {
    /// Whether the connection settings are complete enough to schedule
    /// refreshes.
    pub fn is_configured(&self) -> bool {
        self.connection.is_complete()
    }

    /// Configured entities in kind order, blank identifiers dropped.
    pub fn entity_configs(&self) -> Vec<EntityConfig> {
        self.entities
            .iter()
            .map(|(kind, id)| EntityConfig::new(*kind, id.as_str()))
            .filter(EntityConfig::is_configured)
            .collect()
    }

    /// Fill every kind without an identifier with its conventional default.
    pub fn with_default_entities(mut self) -> Self {
        for kind in EntityKind::all() {
            let entry = self.entities.entry(kind).or_default();
            if entry.trim().is_empty() {
                kind.default_identifier().clone_into(entry);
            }
        }
        self
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn refresh_interval_is_clamped() {
        assert_eq!(RefreshInterval::from_secs(1).get(), Duration::from_secs(10));
        assert_eq!(RefreshInterval::from_secs(45).get(), Duration::from_secs(45));
        assert_eq!(RefreshInterval::from_secs(3600).get(), Duration::from_secs(300));
        assert_eq!(RefreshInterval::default().get(), Duration::from_secs(30));
    }

    #[test]
    fn entity_configs_skip_blank_identifiers() {
        let config = CoordinatorConfig {
            entities: BTreeMap::from([
                (EntityKind::Solar, "sensor.pv".to_owned()),
                (EntityKind::GridUsage, "   ".to_owned()),
                (EntityKind::HomePower, "sensor.load ".to_owned()),
            ]),
            ..CoordinatorConfig::default()
        };

        let ids: Vec<_> = config
            .entity_configs()
            .iter()
            .map(|c| (c.kind(), c.identifier().to_owned()))
            .collect();
        assert_eq!(
            ids,
            vec![
                (EntityKind::Solar, "sensor.pv".to_owned()),
                (EntityKind::HomePower, "sensor.load".to_owned()),
            ]
        );
    }

    #[test]
    fn default_entities_keep_explicit_ones() {
        let config = CoordinatorConfig {
            entities: BTreeMap::from([(EntityKind::Solar, "sensor.pv".to_owned())]),
            ..CoordinatorConfig::default()
        }
        .with_default_entities();

        assert_eq!(config.entity_configs().len(), 8);
        assert_eq!(config.entities[&EntityKind::Solar], "sensor.pv");
        assert_eq!(config.entities[&EntityKind::GridUsage], "sensor.grid_power");
    }

    #[test]
    fn configured_needs_url_and_token() {
        assert!(!CoordinatorConfig::default().is_configured());

        let config = CoordinatorConfig {
            connection: Connection::new(
                "http://ha.local:8123",
                SecretString::from("token".to_owned()),
            ),
            ..CoordinatorConfig::default()
        };
        assert!(config.is_configured());
    }

    #[test]
    fn transport_maps_tls() {
        let config = CoordinatorConfig {
            tls: TlsVerification::DangerAcceptInvalid,
            timeout: Duration::from_secs(3),
            ..CoordinatorConfig::default()
        };
        let transport = config.transport();
        assert_eq!(transport.tls, TlsMode::DangerAcceptInvalid);
        assert_eq!(transport.timeout, Duration::from_secs(3));
    }
}
