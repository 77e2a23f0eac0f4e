// ── Core error types ──
//
// Domain-level errors surfaced by the coordinator's public operations.
// Per-entity fetch failures inside a refresh tick never reach this type;
// they become sentinels in the snapshot. The `From<powerflow_api::Error>`
// impl covers the operations that do surface transport errors
// (connection checks, client construction).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Home Assistant connection is not configured: {message}")]
    NotConfigured { message: String },

    #[error("Cannot connect to Home Assistant: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: access token rejected")]
    AuthenticationFailed,

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {identifier}")]
    EntityNotFound { identifier: String },

    #[error("Malformed response from Home Assistant: {message}")]
    MalformedResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Coordinator has been shut down")]
    ShutDown,
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<powerflow_api::Error> for CoreError {
    fn from(err: powerflow_api::Error) -> Self {
        use powerflow_api::Error as Api;

        match err {
            Api::Configuration { message } => CoreError::NotConfigured { message },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::InvalidEntityId { identifier } | Api::NotFound { entity_id: identifier } => {
                CoreError::EntityNotFound { identifier }
            }
            Api::Unauthorized => CoreError::AuthenticationFailed,
            Api::MalformedResponse { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
            Api::Transport(ref e) if e.is_timeout() => CoreError::Timeout,
            Api::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            Api::UnexpectedStatus { status, message } => CoreError::ConnectionFailed {
                reason: if message.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {message}")
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_translate() {
        assert!(matches!(
            CoreError::from(powerflow_api::Error::Unauthorized),
            CoreError::AuthenticationFailed
        ));
        assert!(matches!(
            CoreError::from(powerflow_api::Error::Configuration {
                message: "base URL is not set".into()
            }),
            CoreError::NotConfigured { .. }
        ));

        let status = CoreError::from(powerflow_api::Error::UnexpectedStatus {
            status: 502,
            message: String::new(),
        });
        assert_eq!(status.to_string(), "Cannot connect to Home Assistant: HTTP 502");
    }
}
