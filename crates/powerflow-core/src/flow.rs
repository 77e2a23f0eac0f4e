// ── Power-flow derivation ──
//
// Computes which directional edges between solar, grid, battery and home
// are carrying power, from the latest value snapshot. Pure: the same
// snapshot always yields the same state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::format::parse_display;
use crate::model::{EntityKind, ValueSnapshot};

/// Grid export below this many watts is treated as measurement noise.
pub const MIN_SIGNIFICANT_EXPORT_WATTS: f64 = 50.0;

// ── Graph ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowNode {
    Solar,
    Grid,
    Battery,
    Home,
}

impl FlowNode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Solar => "Solar",
            Self::Grid => "Grid",
            Self::Battery => "Battery",
            Self::Home => "Home",
        }
    }
}

/// A directional edge in the flow graph.
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
)]
#[serde(rename_all = "snake_case")]
pub enum FlowEdge {
    #[strum(to_string = "Solar → Home")]
    SolarToHome,
    #[strum(to_string = "Solar → Battery")]
    SolarToBattery,
    #[strum(to_string = "Solar → Grid")]
    SolarToGrid,
    #[strum(to_string = "Grid → Home")]
    GridToHome,
    #[strum(to_string = "Grid → Battery")]
    GridToBattery,
    #[strum(to_string = "Battery → Home")]
    BatteryToHome,
    #[strum(to_string = "Battery → Grid")]
    BatteryToGrid,
}

impl FlowEdge {
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    pub fn source(self) -> FlowNode {
        match self {
            Self::SolarToHome | Self::SolarToBattery | Self::SolarToGrid => FlowNode::Solar,
            Self::GridToHome | Self::GridToBattery => FlowNode::Grid,
            Self::BatteryToHome | Self::BatteryToGrid => FlowNode::Battery,
        }
    }

    pub fn target(self) -> FlowNode {
        match self {
            Self::SolarToHome | Self::GridToHome | Self::BatteryToHome => FlowNode::Home,
            Self::SolarToBattery | Self::GridToBattery => FlowNode::Battery,
            Self::SolarToGrid | Self::BatteryToGrid => FlowNode::Grid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum GridDirection {
    Importing,
    Exporting,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum BatteryDirection {
    Charging,
    Discharging,
    Idle,
}

// ── Derived state ───────────────────────────────────────────────────

/// Read-only view of the current power flow.
///
/// `grid_watts` is positive when importing and negative when exporting;
/// `battery_net_watts` is positive when charging and negative when
/// discharging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFlowState {
    pub solar_watts: f64,
    pub grid_watts: f64,
    pub battery_net_watts: f64,
    pub battery_soc_percent: f64,
    pub home_watts: f64,
    edges: BTreeMap<FlowEdge, f64>,
}

impl PowerFlowState {
    pub fn is_active(&self, edge: FlowEdge) -> bool {
        self.edges.contains_key(&edge)
    }

    /// Magnitude in watts of an active edge.
    pub fn magnitude(&self, edge: FlowEdge) -> Option<f64> {
        self.edges.get(&edge).copied()
    }

    pub fn active_edges(&self) -> impl Iterator<Item = (FlowEdge, f64)> + '_ {
        self.edges.iter().map(|(e, w)| (*e, *w))
    }

    pub fn grid_direction(&self) -> GridDirection {
        if self.grid_watts > 0.0 {
            GridDirection::Importing
        } else if self.grid_watts < 0.0 {
            GridDirection::Exporting
        } else {
            GridDirection::Idle
        }
    }

    pub fn battery_direction(&self) -> BatteryDirection {
        if self.battery_net_watts > 0.0 {
            BatteryDirection::Charging
        } else if self.battery_net_watts < 0.0 {
            BatteryDirection::Discharging
        } else {
            BatteryDirection::Idle
        }
    }
}

/// Numeric inputs to the derivation, already degraded to 0 where missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowInputs {
    pub solar: f64,
    pub grid: f64,
    pub charging: f64,
    pub discharging: f64,
    pub battery_soc: f64,
    pub home: f64,
}

impl FlowInputs {
    pub fn from_snapshot(snapshot: &ValueSnapshot) -> Self {
        let watts = |kind: EntityKind| snapshot.numeric(kind).unwrap_or(0.0);
        Self {
            solar: watts(EntityKind::Solar),
            grid: watts(EntityKind::GridUsage),
            charging: watts(EntityKind::BatteryCharging),
            discharging: watts(EntityKind::BatteryDischarging),
            battery_soc: watts(EntityKind::BatterySoc),
            home: watts(EntityKind::HomePower),
        }
    }

    pub fn from_display(values: &BTreeMap<EntityKind, String>) -> Self {
        let watts = |kind: EntityKind| {
            values
                .get(&kind)
                .and_then(|s| parse_display(s))
                .unwrap_or(0.0)
        };
        Self {
            solar: watts(EntityKind::Solar),
            grid: watts(EntityKind::GridUsage),
            charging: watts(EntityKind::BatteryCharging),
            discharging: watts(EntityKind::BatteryDischarging),
            battery_soc: watts(EntityKind::BatterySoc),
            home: watts(EntityKind::HomePower),
        }
    }
}

/// Derive the flow state from a snapshot. Sentinel values count as 0.
pub fn derive(snapshot: &ValueSnapshot) -> PowerFlowState {
    derive_inputs(FlowInputs::from_snapshot(snapshot))
}

/// Derive from `kind -> display string` pairs, parsing the numbers back out
/// of the formatted strings.
pub fn derive_from_display(values: &BTreeMap<EntityKind, String>) -> PowerFlowState {
    derive_inputs(FlowInputs::from_display(values))
}

pub fn derive_inputs(inputs: FlowInputs) -> PowerFlowState {
    let FlowInputs {
        solar,
        grid,
        charging,
        discharging,
        battery_soc,
        home,
    } = inputs;
    let net = charging - discharging;
    let export = if grid < 0.0 { grid.abs() } else { 0.0 };

    let mut edges = BTreeMap::new();
    let mut activate = |edge: FlowEdge, active: bool, watts: f64| {
        if active {
            edges.insert(edge, watts);
        }
    };

    activate(
        FlowEdge::SolarToHome,
        solar > 0.0 && home > 0.0 && solar >= home,
        home,
    );
    activate(FlowEdge::SolarToBattery, net > 0.0, net);
    activate(
        FlowEdge::SolarToGrid,
        grid < 0.0 && export >= MIN_SIGNIFICANT_EXPORT_WATTS,
        export,
    );
    activate(FlowEdge::GridToHome, grid > 0.0 && home > solar, home - solar);
    activate(FlowEdge::GridToBattery, net > 0.0 && solar < net, net - solar);
    activate(FlowEdge::BatteryToHome, net < 0.0, net.abs());
    activate(
        FlowEdge::BatteryToGrid,
        grid < 0.0 && export > solar && export - solar >= MIN_SIGNIFICANT_EXPORT_WATTS,
        export - solar,
    );

    PowerFlowState {
        solar_watts: solar,
        grid_watts: grid,
        battery_net_watts: net,
        battery_soc_percent: battery_soc,
        home_watts: home,
        edges,
    }
}
