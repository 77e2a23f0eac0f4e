//! Configuration for powerflow.
//!
//! A TOML file merged with `POWERFLOW_`-prefixed environment variables,
//! credential resolution (env var, keyring, plaintext), and translation to
//! `powerflow_core::CoordinatorConfig`. The core crate never reads files;
//! this crate is the only place that does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use powerflow_core::{
    Connection, CoordinatorConfig, EntityKind, RefreshInterval, TlsVerification,
};

const KEYRING_SERVICE: &str = "powerflow";
const KEYRING_USER: &str = "token";
const ENV_PREFIX: &str = "POWERFLOW_";
const REDACTED: &str = "<redacted>";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Fill kinds missing from `[entities]` with conventional ids.
    #[serde(default)]
    pub use_default_entities: bool,

    /// Kinds to show, in order.
    #[serde(default = "default_display")]
    pub display: Vec<String>,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub refresh: RefreshSection,

    /// Entity kind (snake_case) to Home Assistant entity id.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_default_entities: false,
            display: default_display(),
            connection: ConnectionSection::default(),
            refresh: RefreshSection::default(),
            entities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSection {
    /// Home Assistant base URL (e.g. "http://homeassistant.local:8123").
    pub url: Option<String>,

    /// Long-lived access token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate (PEM).
    pub ca_cert: Option<PathBuf>,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            token_env: None,
            timeout_secs: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshSection {
    /// Seconds between refreshes; clamped to 10..=300.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

fn default_display() -> Vec<String> {
    EntityKind::displayable().map(|k| k.to_string()).collect()
}
fn default_timeout() -> u64 {
    10
}
fn default_interval() -> u64 {
    30
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "powerflow", "powerflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("powerflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path` (if it exists), then
/// `POWERFLOW_*` environment variables with `__` separating sections.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from `path` (or the platform default) plus the
/// environment. A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

impl Config {
    /// Parse a TOML document on top of the defaults, ignoring the
    /// environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml))
            .extract()?;
        Ok(config)
    }

    /// Copy with the plaintext token masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.connection.token.is_some() {
            copy.connection.token = Some(REDACTED.into());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Where the access token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keyring,
    ConfigFile,
}

/// Resolve the access token: `token_env` variable, then the system
/// keyring, then plaintext `token`. `None` if nothing is set.
pub fn resolve_token(connection: &ConnectionSection) -> Option<(SecretString, TokenSource)> {
    // 1. Named env var
    if let Some(value) = connection
        .token_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.trim().is_empty())
    {
        return Some((SecretString::from(value), TokenSource::Environment));
    }

    // 2. System keyring
    if let Some(secret) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .and_then(|entry| entry.get_password())
        .ok()
    {
        return Some((SecretString::from(secret), TokenSource::Keyring));
    }

    // 3. Plaintext in config
    connection
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(|t| (SecretString::from(t.to_owned()), TokenSource::ConfigFile))
}

/// Store a token in the system keyring.
pub fn store_token(token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| invalid("keyring", e.to_string()))
}

// ── Translation to core config ──────────────────────────────────────

impl Config {
    /// Build the coordinator configuration.
    ///
    /// A missing URL or token is not an error: the coordinator simply stays
    /// disconnected. A URL that is present but unusable is.
    pub fn to_coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        let base_url = self.validated_url()?;
        let token = resolve_token(&self.connection).map(|(secret, _)| secret);

        if self.connection.timeout_secs == 0 {
            return Err(invalid("connection.timeout_secs", "must be at least 1"));
        }

        let tls = if self.connection.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.connection.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let config = CoordinatorConfig {
            connection: Connection { base_url, token },
            entities: self.parsed_entities()?,
            refresh_interval: RefreshInterval::from_secs(self.refresh.interval_secs),
            display: self.parsed_display()?,
            tls,
            timeout: Duration::from_secs(self.connection.timeout_secs),
        };

        Ok(if self.use_default_entities {
            config.with_default_entities()
        } else {
            config
        })
    }

    fn validated_url(&self) -> Result<Option<String>, ConfigError> {
        let Some(raw) = self
            .connection
            .url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };

        let url = url::Url::parse(raw)
            .map_err(|e| invalid("connection.url", format!("{raw:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "connection.url",
                format!("expected http or https, got {:?}", url.scheme()),
            ));
        }
        Ok(Some(raw.to_owned()))
    }

    fn parsed_entities(&self) -> Result<BTreeMap<EntityKind, String>, ConfigError> {
        self.entities
            .iter()
            .map(|(key, id)| {
                let kind = parse_kind(key, &format!("entities.{key}"))?;
                Ok((kind, id.trim().to_owned()))
            })
            .collect()
    }

    fn parsed_display(&self) -> Result<Vec<EntityKind>, ConfigError> {
        self.display
            .iter()
            .map(|key| {
                let kind = parse_kind(key, "display")?;
                if kind.is_displayable() {
                    Ok(kind)
                } else {
                    Err(invalid("display", format!("{key} cannot be displayed")))
                }
            })
            .collect()
    }
}

fn parse_kind(key: &str, field: &str) -> Result<EntityKind, ConfigError> {
    EntityKind::from_str(key.trim()).map_err(|_| {
        let known: Vec<String> = EntityKind::all().map(|k| k.to_string()).collect();
        invalid(
            field,
            format!("unknown entity kind {key:?} (expected one of {})", known.join(", ")),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
        use_default_entities = false
        display = ["solar", "battery_soc", "grid_usage"]

        [connection]
        url = "http://homeassistant.local:8123"
        token = "plain-token"
        timeout_secs = 5

        [refresh]
        interval_secs = 45

        [entities]
        solar = "sensor.pv_power"
        grid_usage = "sensor.grid"
        home_power = ""
    "#;

    #[test]
    fn defaults_without_file() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.connection.timeout_secs, 10);
        assert_eq!(config.display.len(), 6);

        let core = config.to_coordinator_config().unwrap();
        assert!(core.connection.base_url.is_none());
        assert!(!core.is_configured());
        assert_eq!(core.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn sample_translates() {
        let core = Config::from_toml_str(SAMPLE)
            .unwrap()
            .to_coordinator_config()
            .unwrap();

        assert_eq!(
            core.connection.base_url.as_deref(),
            Some("http://homeassistant.local:8123")
        );
        assert_eq!(core.refresh_interval.get(), Duration::from_secs(45));
        assert_eq!(core.timeout, Duration::from_secs(5));
        assert_eq!(
            core.display,
            vec![EntityKind::Solar, EntityKind::BatterySoc, EntityKind::GridUsage]
        );
        let kinds: Vec<_> = core.entity_configs().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![EntityKind::Solar, EntityKind::GridUsage]);
    }

    #[test]
    fn interval_is_clamped() {
        let core = Config::from_toml_str("[refresh]\ninterval_secs = 2")
            .unwrap()
            .to_coordinator_config()
            .unwrap();
        assert_eq!(core.refresh_interval.get(), Duration::from_secs(10));
    }

    #[test]
    fn default_entities_fill_gaps() {
        let core = Config::from_toml_str(
            "use_default_entities = true\n[entities]\nsolar = \"sensor.pv\"",
        )
        .unwrap()
        .to_coordinator_config()
        .unwrap();
        assert_eq!(core.entity_configs().len(), 8);
        assert_eq!(core.entities[&EntityKind::Solar], "sensor.pv");
        assert_eq!(core.entities[&EntityKind::HomePower], "sensor.home_power");
    }

    #[test]
    fn unknown_entity_kind_is_rejected() {
        let err = Config::from_toml_str("[entities]\nwind = \"sensor.turbine\"")
            .unwrap()
            .to_coordinator_config()
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "entities.wind"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn internal_kinds_cannot_be_displayed() {
        let err = Config::from_toml_str("display = [\"battery_charging\"]")
            .unwrap()
            .to_coordinator_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "display"));
    }

    #[test]
    fn malformed_url_is_rejected() {
        for url in ["not a url", "ftp://ha.local"] {
            let toml = format!("[connection]\nurl = {url:?}");
            let err = Config::from_toml_str(&toml)
                .unwrap()
                .to_coordinator_config()
                .unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::Validation { ref field, .. } if field == "connection.url"
                ),
                "{url}: {err}"
            );
        }
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let core = Config::from_toml_str(
            "[connection]\ninsecure = true\nca_cert = \"/etc/ha-ca.pem\"",
        )
        .unwrap()
        .to_coordinator_config()
        .unwrap();
        assert_eq!(core.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn redacted_masks_token() {
        let config = Config::from_toml_str(SAMPLE).unwrap().redacted();
        assert_eq!(config.connection.token.as_deref(), Some(REDACTED));
        assert!(!config.to_toml().unwrap().contains("plain-token"));
    }

    #[test]
    fn file_and_environment_merge() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "powerflow.toml",
                r#"
                    [connection]
                    url = "http://ha.local:8123"
                    token_env = "HASS_TOKEN"

                    [entities]
                    solar = "sensor.pv"
                "#,
            )?;
            jail.set_env("HASS_TOKEN", "from-env");
            jail.set_env("POWERFLOW_REFRESH__INTERVAL_SECS", "120");
            jail.set_env("POWERFLOW_ENTITIES__HOME_POWER", "sensor.load");

            let config =
                load_config(Some(Path::new("powerflow.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.refresh.interval_secs, 120);
            assert_eq!(config.entities["home_power"], "sensor.load");

            let (token, source) = resolve_token(&config.connection).unwrap();
            assert_eq!(token.expose_secret(), "from-env");
            assert_eq!(source, TokenSource::Environment);

            let core = config.to_coordinator_config().map_err(|e| e.to_string())?;
            assert!(core.is_configured());
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_not_an_error() {
        Jail::expect_with(|_jail| {
            let config = load_config(Some(Path::new("absent.toml"))).map_err(|e| e.to_string())?;
            assert!(config.connection.url.is_none());
            Ok(())
        });
    }
}
