// ── Entity kinds and configuration ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// How a kind's value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Watts.
    Power,
    /// State of charge, 0-100.
    Percentage,
    /// Price per kWh.
    Currency,
}

/// The closed set of sensors the engine polls.
///
/// `Display` / `FromStr` use the snake_case config key (`battery_soc`);
/// [`display_name`](Self::display_name) is the human label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Solar,
    BatterySoc,
    BatteryCharging,
    BatteryDischarging,
    GridUsage,
    HomePower,
    PurchasePrice,
    FeedInTariff,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Kinds a user may pick for display. The battery charging/discharging
    /// sub-readings only feed the net battery flow.
    pub fn displayable() -> impl Iterator<Item = Self> {
        Self::iter().filter(|k| k.is_displayable())
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Solar => "Solar",
            Self::BatterySoc => "Battery",
            Self::BatteryCharging => "Battery Charging",
            Self::BatteryDischarging => "Battery Discharging",
            Self::GridUsage => "Grid",
            Self::HomePower => "Home",
            Self::PurchasePrice => "Buy Price",
            Self::FeedInTariff => "Feed-in Tariff",
        }
    }

    pub fn unit_kind(self) -> UnitKind {
        match self {
            Self::Solar
            | Self::BatteryCharging
            | Self::BatteryDischarging
            | Self::GridUsage
            | Self::HomePower => UnitKind::Power,
            Self::BatterySoc => UnitKind::Percentage,
            Self::PurchasePrice | Self::FeedInTariff => UnitKind::Currency,
        }
    }

    /// Conventional Home Assistant entity id used when none is configured.
    pub fn default_identifier(self) -> &'static str {
        match self {
            Self::Solar => "sensor.solar_power",
            Self::BatterySoc => "sensor.battery_state_of_charge",
            Self::BatteryCharging => "sensor.battery_charging_power",
            Self::BatteryDischarging => "sensor.battery_discharging_power",
            Self::GridUsage => "sensor.grid_power",
            Self::HomePower => "sensor.home_power",
            Self::PurchasePrice => "sensor.electricity_price",
            Self::FeedInTariff => "sensor.feed_in_tariff",
        }
    }

    pub fn is_displayable(self) -> bool {
        !matches!(self, Self::BatteryCharging | Self::BatteryDischarging)
    }
}

/// A kind bound to the remote identifier that addresses it.
///
/// Identifiers are trimmed on construction. An empty identifier means the
/// kind is not configured and is skipped by the refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityConfig {
    kind: EntityKind,
    identifier: String,
}

impl EntityConfig {
    pub fn new(kind: EntityKind, identifier: impl Into<String>) -> Self {
        let identifier: String = identifier.into();
        Self {
            kind,
            identifier: identifier.trim().to_owned(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_configured(&self) -> bool {
        !self.identifier.is_empty()
    }
}
