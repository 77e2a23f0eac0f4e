//! Command handlers: one module per top-level subcommand.

pub mod check;
pub mod config_cmd;
pub mod once;
pub mod watch;

use powerflow_core::CoordinatorConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a coordinator-backed command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: CoordinatorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Once(args) => once::handle(config, &args, global).await,
        Command::Watch(args) => watch::handle(config, &args, global).await,
        Command::Check => check::handle(config, global).await,
        // Handled in main before a coordinator config is built
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
