//! `powerflow config`: inspect the resolved configuration and manage the
//! stored token.

use powerflow_config::{TokenSource, resolve_token, store_token};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{config_file, load};
use crate::error::CliError;
use crate::output::{print_output, render_json};

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            print_output(&config_file(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load(global)?;
            let redacted = cfg.redacted();
            let rendered = match global.output {
                OutputFormat::Table => {
                    let source = if global.token.is_some() {
                        "command line"
                    } else {
                        resolve_token(&cfg.connection)
                            .map_or("not set", |(_, source)| token_source_label(source))
                    };
                    format!("{}\n# token: {source}", redacted.to_toml()?.trim_end())
                }
                OutputFormat::Json => render_json(&redacted, false)?,
                OutputFormat::JsonCompact => render_json(&redacted, true)?,
            };
            print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "must not be empty".into(),
                });
            }
            store_token(token)?;
            print_output("Token stored in the system keyring", global.quiet);
            Ok(())
        }
    }
}

fn token_source_label(source: TokenSource) -> &'static str {
    match source {
        TokenSource::Environment => "environment variable",
        TokenSource::Keyring => "system keyring",
        TokenSource::ConfigFile => "config file (plaintext)",
    }
}
