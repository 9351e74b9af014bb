use std::env;

use crate::config::AtlasConfig;
use crate::domain::DomainError;

/// Environment variable holding the refresh token
pub const REFRESH_TOKEN_ENV: &str = "ATLAS_REFRESH_TOKEN";

/// Where the refresh token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenSource {
    Explicit,
    Environment,
    ConfigFile,
}

/// Resolve the refresh token: explicit value, then `ATLAS_REFRESH_TOKEN`,
/// then the config file.
pub fn resolve_refresh_token(
    explicit: Option<&str>,
    config: &AtlasConfig,
) -> Result<(String, RefreshTokenSource), DomainError> {
    resolve_with(explicit, config, |name| env::var(name).ok())
}

fn resolve_with(
    explicit: Option<&str>,
    config: &AtlasConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(String, RefreshTokenSource), DomainError> {
    let non_empty = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    let resolved = explicit
        .and_then(non_empty)
        .map(|t| (t, RefreshTokenSource::Explicit))
        .or_else(|| {
            lookup(REFRESH_TOKEN_ENV)
                .as_deref()
                .and_then(non_empty)
                .map(|t| (t, RefreshTokenSource::Environment))
        })
        .or_else(|| {
            config
                .configured_refresh_token()
                .and_then(non_empty)
                .map(|t| (t, RefreshTokenSource::ConfigFile))
        });

    match resolved {
        Some(resolved) => Ok(resolved),
        None => Err(DomainError::auth(format!(
            "No refresh token: pass one explicitly, set {} \
             or add refresh_token to ~/.config/atlas/config.toml",
            REFRESH_TOKEN_ENV
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> AtlasConfig {
        let mut config = AtlasConfig::default();
        config.auth.refresh_token = token.map(str::to_string);
        config
    }

    #[test]
    fn test_explicit_wins() {
        let (token, source) = resolve_with(
            Some("explicit"),
            &config_with_token(Some("file")),
            |_| Some("env".to_string()),
        )
        .unwrap();
        assert_eq!(token, "explicit");
        assert_eq!(source, RefreshTokenSource::Explicit);
    }

    #[test]
    fn test_environment_before_file() {
        let (token, source) =
            resolve_with(None, &config_with_token(Some("file")), |name| {
                (name == REFRESH_TOKEN_ENV).then(|| "env".to_string())
            })
            .unwrap();
        assert_eq!(token, "env");
        assert_eq!(source, RefreshTokenSource::Environment);
    }

    #[test]
    fn test_blank_values_fall_through() {
        let (token, source) = resolve_with(Some("  "), &config_with_token(Some(" file ")), |_| {
            Some(String::new())
        })
        .unwrap();
        assert_eq!(token, "file");
        assert_eq!(source, RefreshTokenSource::ConfigFile);
    }

    #[test]
    fn test_missing_everywhere() {
        let err = resolve_with(None, &config_with_token(None), |_| None).unwrap_err();
        assert!(matches!(err, DomainError::Auth { .. }));
        assert!(err.to_string().contains(REFRESH_TOKEN_ENV));
    }
}
