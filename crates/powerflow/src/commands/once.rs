//! `powerflow once`: run a single refresh tick and print it.

use powerflow_core::{
    ConnectionStatus, Coordinator, CoordinatorConfig, EntityKind, FailureKind, TickReport,
};

use crate::cli::{GlobalOpts, OnceArgs};
use crate::config::require_configured;
use crate::error::CliError;
use crate::output::{print_output, render_state, should_color};

pub async fn handle(
    config: CoordinatorConfig,
    args: &OnceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    require_configured(&config, global)?;

    let kinds: Vec<EntityKind> = if args.all {
        EntityKind::all().collect()
    } else {
        config.display.clone()
    };

    let coordinator = Coordinator::new(config)?;
    let outcome = coordinator.refresh().await;
    let state = coordinator.state();
    let flow = args.flow.then(|| coordinator.power_flow());
    coordinator.shutdown().await;
    let outcome = outcome?;

    let rendered = render_state(
        global.output,
        &state,
        &kinds,
        flow.as_ref(),
        should_color(global.color),
    )?;
    print_output(&rendered, global.quiet);

    match outcome.report() {
        Some(report) if report.status == ConnectionStatus::Error => Err(refresh_failed(report)),
        _ => Ok(()),
    }
}

/// Turn an all-failed tick into an error. Rejected credentials on every
/// entity surface as an authentication failure.
pub(crate) fn refresh_failed(report: &TickReport) -> CliError {
    if !report.failures.is_empty()
        && report
            .failures
            .iter()
            .all(|(_, failure)| *failure == FailureKind::Unauthorized)
    {
        return CliError::AuthFailed;
    }

    let summary = report
        .failures
        .iter()
        .map(|(kind, failure)| format!("{kind}: {}", failure_label(*failure)))
        .collect::<Vec<_>>()
        .join(", ");
    CliError::RefreshFailed {
        attempted: report.attempted,
        summary,
    }
}

fn failure_label(failure: FailureKind) -> &'static str {
    match failure {
        FailureKind::Configuration => "invalid configuration",
        FailureKind::Unauthorized => "unauthorized",
        FailureKind::NotFound => "not found",
        FailureKind::MalformedResponse => "malformed response",
        FailureKind::Transport => "unreachable",
    }
}
