//! `powerflow watch`: start the scheduler and print every published
//! snapshot until interrupted.

use futures_util::StreamExt;
use tracing::info;

use powerflow_core::{Coordinator, CoordinatorConfig, RefreshInterval, flow};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::require_configured;
use crate::error::CliError;
use crate::output::{print_output, render_state, should_color};

pub async fn handle(
    mut config: CoordinatorConfig,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    require_configured(&config, global)?;
    if let Some(interval) = args.interval {
        config.refresh_interval = RefreshInterval::new(interval);
    }

    let kinds = config.display.clone();
    let period = config.refresh_interval.get();
    // One JSON document per line so the stream stays machine-readable
    let format = match global.output {
        OutputFormat::Json => OutputFormat::JsonCompact,
        other => other,
    };
    let color = should_color(global.color);

    let coordinator = Coordinator::new(config)?;
    let mut refreshes = coordinator.subscribe().refreshes();
    coordinator.start().await?;
    info!(interval = %humantime::format_duration(period), "watching Home Assistant");

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            next = refreshes.next() => {
                let Some(state) = next else { break Ok(()) };
                let flow = args.flow.then(|| flow::derive(&state.snapshot));
                match render_state(format, &state, &kinds, flow.as_ref(), color) {
                    Ok(rendered) => print_output(&rendered, global.quiet),
                    Err(err) => break Err(err),
                }
            }
        }
    };

    coordinator.shutdown().await;
    result
}
