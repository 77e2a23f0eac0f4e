// Home Assistant entity state client
//
// Wraps `reqwest::Client` with bearer-token auth, URL construction, and
// status-code mapping into the fetch failure taxonomy. Connection settings
// are passed per call: they are validated before any network I/O so an
// unconfigured caller gets `Error::Configuration` immediately.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ApiStatus, EntityState};
use crate::transport::TransportConfig;

/// Where and how to reach a Home Assistant instance.
///
/// Both fields are optional so that an incomplete settings store can still
/// be represented; [`StateClient`] rejects it at call time.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    /// Instance root, e.g. `http://homeassistant.local:8123`.
    pub base_url: Option<String>,
    /// Long-lived access token.
    pub token: Option<SecretString>,
}

impl Connection {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            base_url: Some(base_url.into()),
            token: Some(token),
        }
    }

    /// Whether both a base URL and a non-blank token are present and the URL
    /// parses. Does not touch the network.
    pub fn is_complete(&self) -> bool {
        self.resolve().is_ok()
    }

    /// Validate the settings, returning the parsed root URL and token.
    fn resolve(&self) -> Result<(Url, &SecretString), Error> {
        let raw = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Configuration {
                message: "base URL is not set".into(),
            })?;

        let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| Error::Configuration {
            message: format!("invalid base URL {raw:?}: {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Configuration {
                message: format!("unsupported URL scheme {:?}", url.scheme()),
            });
        }

        let token = self
            .token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
            .ok_or_else(|| Error::Configuration {
                message: "access token is not set".into(),
            })?;

        Ok((url, token))
    }
}

/// Raw HTTP client for the Home Assistant REST API.
///
/// One round trip per call, no retries and no caching: retry policy
/// belongs to the caller's refresh schedule.
#[derive(Debug, Clone)]
pub struct StateClient {
    http: reqwest::Client,
}

impl StateClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`, keeping any path prefix on the base URL
    /// (reverse-proxied instances).
    fn api_url(base: &Url, path: &str) -> Result<Url, Error> {
        let full = format!("{}/api/{}", base.as_str().trim_end_matches('/'), path);
        Url::parse(&full).map_err(|e| Error::Configuration {
            message: format!("cannot build API URL: {e}"),
        })
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the current state of one entity.
    pub async fn get_state(
        &self,
        connection: &Connection,
        entity_id: &str,
    ) -> Result<EntityState, Error> {
        let (base, token) = connection.resolve()?;

        let entity_id = entity_id.trim();
        if entity_id.is_empty() || entity_id.contains(['/', '?', '#']) {
            return Err(Error::InvalidEntityId {
                identifier: entity_id.to_owned(),
            });
        }

        let url = Self::api_url(&base, &format!("states/{entity_id}"))?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        match resp.status() {
            status if status.is_success() => {
                let body = resp.text().await.map_err(Error::Transport)?;
                let state: EntityState =
                    serde_json::from_str(&body).map_err(|e| Error::MalformedResponse {
                        message: e.to_string(),
                        body: body.clone(),
                    })?;
                debug!(entity = entity_id, state = %state.state, "entity state fetched");
                Ok(state)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                entity_id: entity_id.to_owned(),
            }),
            status => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Probe `GET /api/` and return the status message Home Assistant
    /// answers with (normally "API running.").
    pub async fn ping(&self, connection: &Connection) -> Result<String, Error> {
        let (base, token) = connection.resolve()?;
        let url = Self::api_url(&base, "")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        match resp.status() {
            status if status.is_success() => {
                let body = resp.text().await.map_err(Error::Transport)?;
                let parsed: ApiStatus =
                    serde_json::from_str(&body).map_err(|e| Error::MalformedResponse {
                        message: e.to_string(),
                        body: body.clone(),
                    })?;
                Ok(parsed.message)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
            status => Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}
