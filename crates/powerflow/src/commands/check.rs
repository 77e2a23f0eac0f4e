//! `powerflow check`: ping the API root with the configured credentials.

use serde::Serialize;

use powerflow_core::{Coordinator, CoordinatorConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config::require_configured;
use crate::error::CliError;
use crate::output::{print_output, render_json};

#[derive(Serialize)]
struct CheckView<'a> {
    url: &'a str,
    message: &'a str,
}

pub async fn handle(config: CoordinatorConfig, global: &GlobalOpts) -> Result<(), CliError> {
    require_configured(&config, global)?;
    let url = config.connection.base_url.clone().unwrap_or_default();

    let coordinator = Coordinator::new(config)?;
    let result = coordinator.check_connection().await;
    coordinator.shutdown().await;
    let message = result?;

    let view = CheckView {
        url: &url,
        message: &message,
    };
    let rendered = match global.output {
        OutputFormat::Table => format!("Connected to {url}: {message}"),
        OutputFormat::Json => render_json(&view, false)?,
        OutputFormat::JsonCompact => render_json(&view, true)?,
    };
    print_output(&rendered, global.quiet);
    Ok(())
}
