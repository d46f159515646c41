//! Sensor configuration.
//!
//! One [`SensorConfig`] describes one tracked team. It is assembled from up to
//! three [`ConfigLayer`]s, later layers overriding earlier ones:
//! config file, environment, command line.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_NAME: &str = "MLB";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Current config-file schema. Version 1 files predate the `timeout` key.
pub const CONFIG_VERSION: u64 = 2;

pub const ENV_CONFIG_PATH: &str = "MLBTUI_CONFIG";
pub const ENV_TEAM_ID: &str = "MLBTUI_TEAM_ID";
pub const ENV_NAME: &str = "MLBTUI_NAME";
pub const ENV_TIMEOUT: &str = "MLBTUI_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// ESPN team abbreviation, e.g. "NYY".
    pub team_id: String,
    /// Display name of the sensor entity.
    pub name: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl SensorConfig {
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: normalize_team_id(&team_id.into()),
            name: DEFAULT_NAME.to_owned(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Stable per-instance id derived from the team.
    pub fn entry_id(&self) -> String {
        slugify(&self.team_id)
    }

    /// Merge `layers` in order and validate the result.
    pub fn resolve<I>(layers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        let merged = layers
            .into_iter()
            .fold(ConfigLayer::default(), ConfigLayer::merge);

        let team_id = merged
            .team_id
            .map(|t| normalize_team_id(&t))
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingTeam)?;
        let timeout = merged.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout == 0 {
            return Err(ConfigError::InvalidTimeout("0".into()));
        }
        let name = merged
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_owned());

        Ok(Self { team_id, name, timeout })
    }
}

/// A partial configuration from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayer {
    pub team_id: Option<String>,
    pub name: Option<String>,
    pub timeout: Option<u64>,
}

impl ConfigLayer {
    /// Fields set in `over` win.
    pub fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            team_id: over.team_id.or(self.team_id),
            name: over.name.or(self.name),
            timeout: over.timeout.or(self.timeout),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from an environment-like lookup. Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let timeout = match get(ENV_TIMEOUT) {
            Some(raw) => Some(parse_timeout(&raw)?),
            None => None,
        };
        Ok(Self {
            team_id: get(ENV_TEAM_ID),
            name: get(ENV_NAME),
            timeout,
        })
    }

    /// Load a config file, migrating (and rewriting) older schema versions.
    /// A missing file is not an error.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(ConfigError::Io(e, path.to_owned())),
        };
        let raw: Value = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(e, path.to_owned()))?;

        let (migrated, changed) = migrate(raw)?;
        if changed {
            info!("migrated {} to config version {CONFIG_VERSION}", path.display());
            let payload = serde_json::to_string_pretty(&migrated)
                .map_err(|e| ConfigError::Parse(e, path.to_owned()))?;
            std::fs::write(path, payload).map_err(|e| ConfigError::Io(e, path.to_owned()))?;
        }

        let layer = serde_json::from_value(migrated)
            .map_err(|e| ConfigError::Parse(e, path.to_owned()))?;
        Ok(Some(layer))
    }
}

/// Bring a config document up to [`CONFIG_VERSION`]. Returns the document and
/// whether anything changed. Documents without a `version` are version 1.
pub fn migrate(mut doc: Value) -> Result<(Value, bool), ConfigError> {
    let Some(obj) = doc.as_object_mut() else {
        return Err(ConfigError::Invalid("config must be a JSON object".into()));
    };
    let version = obj.get("version").and_then(Value::as_u64).unwrap_or(1);
    if version > CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(version));
    }
    if version == CONFIG_VERSION {
        return Ok((doc, false));
    }

    // 1 -> 2: timeout became configurable.
    debug!("migrating config from version {version}");
    obj.entry("timeout").or_insert(Value::from(DEFAULT_TIMEOUT_SECS));
    obj.insert("version".into(), Value::from(CONFIG_VERSION));
    Ok((doc, true))
}

/// `$MLBTUI_CONFIG`, else `$XDG_CONFIG_HOME/mlbtui/config.json`, else
/// `$HOME/.config/mlbtui/config.json`, else `./mlbtui.json`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH)
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
        && !config_dir.trim().is_empty()
    {
        return PathBuf::from(config_dir).join("mlbtui").join("config.json");
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home)
            .join(".config")
            .join("mlbtui")
            .join("config.json");
    }
    PathBuf::from("mlbtui.json")
}

pub fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidTimeout(raw.to_owned())),
    }
}

/// ESPN abbreviations are upper case.
fn normalize_team_id(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Lower-case, with runs of anything non-alphanumeric collapsed to `_`.
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[derive(Debug)]
pub enum ConfigError {
    MissingTeam,
    InvalidTimeout(String),
    UnsupportedVersion(u64),
    Invalid(String),
    Io(std::io::Error, PathBuf),
    Parse(serde_json::Error, PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingTeam => write!(
                f,
                "No team configured: pass --team <ABBR> or set {ENV_TEAM_ID}"
            ),
            ConfigError::InvalidTimeout(raw) => {
                write!(f, "Invalid timeout {raw:?}: expected a positive number of seconds")
            }
            ConfigError::UnsupportedVersion(v) => write!(
                f,
                "Config version {v} is newer than supported version {CONFIG_VERSION}"
            ),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {msg}"),
            ConfigError::Io(e, path) => write!(f, "Could not access {}: {e}", path.display()),
            ConfigError::Parse(e, path) => write!(f, "Invalid config at {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e, _) => Some(e),
            ConfigError::Parse(e, _) => Some(e),
            _ => None,
        }
    }
}
