//! Output formatting: table or JSON.
//!
//! Table uses `tabled` with status coloring, structured formats use serde.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use powerflow_core::format::format_number;
use powerflow_core::{
    BatteryDirection, ConnectionStatus, EntityKind, EntityValue, GridDirection, PowerFlowState,
    RefreshState, UnitKind,
};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn paint_status(status: ConnectionStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        ConnectionStatus::Connected => text.green().bold().to_string(),
        ConnectionStatus::Disconnected => text.yellow().to_string(),
        ConnectionStatus::Error => text.red().bold().to_string(),
    }
}

fn paint_value_state(value: &EntityValue, color: bool) -> String {
    let text = match value {
        EntityValue::Available { .. } => "ok",
        EntityValue::Unavailable => "unavailable",
        EntityValue::FetchFailed => "fetch failed",
    };
    if !color {
        return text.to_owned();
    }
    match value {
        EntityValue::Available { .. } => text.green().to_string(),
        EntityValue::Unavailable => text.dimmed().to_string(),
        EntityValue::FetchFailed => text.red().to_string(),
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "Entity")]
    entity: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "State")]
    state: String,
}

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "Flow")]
    edge: String,
    #[tabled(rename = "Power")]
    power: String,
}

// ── Structured views ─────────────────────────────────────────────────

#[derive(Serialize)]
struct SnapshotView<'a> {
    status: ConnectionStatus,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
    values: Vec<ValueView<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flow: Option<&'a PowerFlowState>,
}

#[derive(Serialize)]
struct ValueView<'a> {
    kind: EntityKind,
    display: &'a str,
    value: Option<f64>,
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render one published state: the chosen kinds, in order, and the flow
/// when requested.
pub fn render_state(
    format: OutputFormat,
    state: &RefreshState,
    kinds: &[EntityKind],
    flow: Option<&PowerFlowState>,
    color: bool,
) -> Result<String, CliError> {
    let snapshot = &state.snapshot;
    let entries: Vec<(EntityKind, &EntityValue)> =
        kinds.iter().map(|k| (*k, snapshot.get(*k))).collect();

    match format {
        OutputFormat::Table => Ok(render_state_table(state, &entries, flow, color)),
        OutputFormat::Json | OutputFormat::JsonCompact => {
            let view = SnapshotView {
                status: state.status,
                generation: snapshot.generation(),
                refreshed_at: snapshot.refreshed_at(),
                values: entries
                    .iter()
                    .map(|(kind, value)| ValueView {
                        kind: *kind,
                        display: value.display(),
                        value: value.numeric(),
                    })
                    .collect(),
                flow,
            };
            render_json(&view, format == OutputFormat::JsonCompact)
        }
    }
}

fn render_state_table(
    state: &RefreshState,
    entries: &[(EntityKind, &EntityValue)],
    flow: Option<&PowerFlowState>,
    color: bool,
) -> String {
    let refreshed = state.snapshot.refreshed_at().map_or_else(
        || "never refreshed".to_owned(),
        |at| format!("refreshed {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
    );
    let mut out = format!(
        "Status: {}  ({refreshed})\n",
        paint_status(state.status, color)
    );

    let rows: Vec<ValueRow> = entries
        .iter()
        .map(|(kind, value)| ValueRow {
            entity: kind.display_name(),
            value: value.display().to_owned(),
            state: paint_value_state(value, color),
        })
        .collect();
    out.push_str(&render_table(&rows));

    if let Some(flow) = flow {
        out.push_str("\n\n");
        out.push_str(&render_flow_table(flow));
    }
    out
}

fn render_flow_table(flow: &PowerFlowState) -> String {
    let grid = match flow.grid_direction() {
        GridDirection::Idle => "idle".to_owned(),
        direction => format!(
            "{} {}",
            direction.to_string().to_lowercase(),
            format_number(flow.grid_watts.abs(), UnitKind::Power)
        ),
    };
    let battery = match flow.battery_direction() {
        BatteryDirection::Idle => "idle".to_owned(),
        direction => format!(
            "{} {}",
            direction.to_string().to_lowercase(),
            format_number(flow.battery_net_watts.abs(), UnitKind::Power)
        ),
    };
    let header = format!("Grid: {grid}  Battery: {battery}\n");

    let rows: Vec<FlowRow> = flow
        .active_edges()
        .map(|(edge, watts)| FlowRow {
            edge: edge.to_string(),
            power: format_number(watts, UnitKind::Power),
        })
        .collect();
    if rows.is_empty() {
        return format!("{header}No active flows");
    }
    format!("{header}{}", render_table(&rows))
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json<T: Serialize + ?Sized>(
    data: &T,
    compact: bool,
) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}
