use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::Deserialize;

use crate::domain::DomainError;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.atlas.ammpower.com/v1";

/// Default OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://api.atlas.ammpower.com/v1/oauth/token";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AtlasConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    /// Root-level refresh token, accepted for older config files
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_url: String,
    pub refresh_token: Option<String>,
    /// Refresh access tokens this many seconds before they expire
    pub refresh_margin_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            refresh_token: None,
            refresh_margin_secs: 60,
        }
    }
}

impl AuthConfig {
    /// `refresh_margin_secs` as a duration
    pub fn refresh_margin(&self) -> Result<TimeDelta, DomainError> {
        TimeDelta::try_seconds(self.refresh_margin_secs).ok_or_else(|| {
            DomainError::configuration(format!(
                "auth.refresh_margin_secs out of range: {}",
                self.refresh_margin_secs
            ))
        })
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_url", &self.token_url)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[hidden]"),
            )
            .field("refresh_margin_secs", &self.refresh_margin_secs)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AtlasConfig {
    /// Load defaults, the user config file, an optional explicit file and
    /// `ATLAS__`-prefixed environment variables, in increasing precedence.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DomainError> {
        let mut builder = config::Config::builder();

        if let Some(user_file) = user_config_path() {
            builder = builder.add_source(config::File::from(user_file).required(false));
        }

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("ATLAS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| DomainError::configuration(e.to_string()))
    }

    /// Load from a single file only
    pub fn from_file(path: &Path) -> Result<Self, DomainError> {
        config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DomainError::configuration(format!("{}: {}", path.display(), e)))
    }

    /// Refresh token from the `[auth]` section, or the root for older files
    pub fn configured_refresh_token(&self) -> Option<&str> {
        self.auth
            .refresh_token
            .as_deref()
            .or(self.refresh_token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// `$XDG_CONFIG_HOME/atlas/config.toml`, else `~/.config/atlas/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    user_config_path_from(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn user_config_path_from(xdg: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    let base = xdg
        .filter(|p| p.is_absolute())
        .or_else(|| home.map(|h| h.join(".config")))?;
    Some(base.join("atlas").join("config.toml"))
}
