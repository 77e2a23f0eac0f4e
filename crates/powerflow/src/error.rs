//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use powerflow_config::ConfigError;
use powerflow_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach Home Assistant: {reason}")]
    #[diagnostic(
        code(powerflow::connection_failed),
        help(
            "Check that Home Assistant is running and reachable from this machine.\n\
             Try: powerflow check -v"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Every configured entity failed to refresh ({attempted} attempted)")]
    #[diagnostic(
        code(powerflow::refresh_failed),
        help("Failures: {summary}\nRun with -v to see each failed request.")
    )]
    RefreshFailed { attempted: usize, summary: String },

    #[error("Home Assistant is not configured")]
    #[diagnostic(
        code(powerflow::not_configured),
        help(
            "Set connection.url and a token in {path},\n\
             or pass --url and --token (POWERFLOW_URL / POWERFLOW_TOKEN)."
        )
    )]
    NotConfigured { path: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(powerflow::auth_failed),
        help(
            "Create a long-lived access token on your Home Assistant profile page.\n\
             Run: powerflow config set-token <TOKEN>"
        )
    )]
    AuthFailed,

    // ── Resources ────────────────────────────────────────────────────

    #[error("Entity '{identifier}' not found")]
    #[diagnostic(
        code(powerflow::not_found),
        help("Check the [entities] table in your config against Developer Tools > States.")
    )]
    NotFound { identifier: String },

    #[error("Unexpected response from Home Assistant: {message}")]
    #[diagnostic(code(powerflow::malformed_response))]
    MalformedResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(powerflow::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(powerflow::config))]
    Config { message: String },

    #[error("Coordinator has been shut down")]
    #[diagnostic(code(powerflow::shut_down))]
    ShutDown,

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Request timed out")]
    #[diagnostic(
        code(powerflow::timeout),
        help("Raise connection.timeout_secs or check Home Assistant responsiveness.")
    )]
    Timeout,

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(powerflow::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::RefreshFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NotConfigured { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotConfigured { .. } => CliError::NotConfigured {
                path: powerflow_config::config_path().display().to_string(),
            },
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::AuthenticationFailed => CliError::AuthFailed,
            CoreError::Timeout => CliError::Timeout,
            CoreError::EntityNotFound { identifier } => CliError::NotFound { identifier },
            CoreError::MalformedResponse { message } => CliError::MalformedResponse { message },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::ShutDown => CliError::ShutDown,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
