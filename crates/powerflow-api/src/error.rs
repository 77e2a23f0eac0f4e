use thiserror::Error;

/// Top-level error type for the `powerflow-api` crate.
///
/// Covers every failure mode of a single entity-state fetch. `powerflow-core`
/// decides which of these abort a whole refresh tick (only
/// [`Configuration`](Error::Configuration)) and which are counted as a
/// per-entity failure.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Base URL or access token missing or malformed. Raised before any
    /// network I/O happens.
    #[error("Connection is not configured: {message}")]
    Configuration { message: String },

    /// Entity identifier was empty or not addressable.
    #[error("Invalid entity identifier: {identifier:?}")]
    InvalidEntityId { identifier: String },

    // ── Authentication ──────────────────────────────────────────────
    /// Access token rejected (HTTP 401 / 403).
    #[error("Access token rejected by Home Assistant")]
    Unauthorized,

    // ── Lookup ──────────────────────────────────────────────────────
    /// Entity id unknown to the remote instance (HTTP 404).
    #[error("Entity not found: {entity_id}")]
    NotFound { entity_id: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body did not decode, with the raw body for debugging.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-success HTTP status.
    #[error("Unexpected HTTP status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),
}

/// Coarse classification of a fetch failure.
///
/// Mirrors the failure taxonomy consumers reason about, independent of the
/// exact variant that carried it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Configuration,
    Unauthorized,
    NotFound,
    MalformedResponse,
    Transport,
}

impl Error {
    /// Classify this error into the fetch failure taxonomy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } | Self::Tls(_) => FailureKind::Configuration,
            Self::Unauthorized => FailureKind::Unauthorized,
            Self::NotFound { .. } | Self::InvalidEntityId { .. } => FailureKind::NotFound,
            Self::MalformedResponse { .. } => FailureKind::MalformedResponse,
            Self::Transport(_) | Self::UnexpectedStatus { .. } => FailureKind::Transport,
        }
    }

    /// Returns `true` if the connection settings themselves are unusable.
    pub fn is_configuration(&self) -> bool {
        self.failure_kind() == FailureKind::Configuration
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_taxonomy() {
        let cfg = Error::Configuration {
            message: "missing url".into(),
        };
        assert_eq!(cfg.failure_kind(), FailureKind::Configuration);
        assert!(cfg.is_configuration());

        assert_eq!(Error::Unauthorized.failure_kind(), FailureKind::Unauthorized);

        let missing = Error::NotFound {
            entity_id: "sensor.nope".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_transient());

        let bad_gateway = Error::UnexpectedStatus {
            status: 502,
            message: String::new(),
        };
        assert_eq!(bad_gateway.failure_kind(), FailureKind::Transport);
        assert!(bad_gateway.is_transient());
    }
}
