//! Environment variable overrides.
//!
//! Applied after the config file so deployments that only set environment
//! variables keep working without a file.

use crate::error::ConfigError;
use crate::schema::RelayConfig;

/// Environment overrides for [`RelayConfig`].
pub struct EnvOverrides;

impl EnvOverrides {
    /// Apply overrides from the process environment.
    pub fn apply(config: &mut RelayConfig) -> Result<(), ConfigError> {
        Self::apply_with(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_with<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            config.server.port = parse_port("PORT", &port)?;
        }
        if let Some(host) = get("SERVER_HOST") {
            config.server.host = host;
        }

        if let Some(host) = get("BROWSER_TOOLS_HOST") {
            config.discovery.host = host;
        }
        if let Some(port) = get("BROWSER_TOOLS_PORT") {
            config.discovery.port = Some(parse_port("BROWSER_TOOLS_PORT", &port)?);
        }

        if let Some(path) = get("SCREENSHOT_STORAGE_PATH") {
            config.screenshots.storage_path = path;
        }
        if let Some(name) = get("PROJECT_NAME") {
            config.screenshots.project_name = Some(name);
        }

        let api = &mut config.api;
        for (key, slot) in [
            ("AUTH_ORIGIN", &mut api.auth_origin),
            ("AUTH_STORAGE_TYPE", &mut api.auth_storage_type),
            ("AUTH_TOKEN_KEY", &mut api.auth_token_key),
            ("API_BASE_URL", &mut api.api_base_url),
            ("SWAGGER_URL", &mut api.swagger_url),
            ("PROJECT_ROOT", &mut api.project_root),
        ] {
            if let Some(value) = get(key) {
                *slot = Some(value);
            }
        }

        Ok(())
    }
}

fn parse_port(field: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("'{}' is not a valid port: {}", value, e),
        })
}
