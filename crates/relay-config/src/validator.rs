//! Configuration validation.

use relay_protocols::StorageType;

use crate::schema::RelayConfig;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &RelayConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_channel(config, &mut result);
        Self::validate_logs(config, &mut result);
        Self::validate_discovery(config, &mut result);
        Self::validate_api(config, &mut result);

        result
    }

    fn validate_server(config: &RelayConfig, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }

        if config.server.port_attempts == 0 {
            result.add_error(ValidationError::new(
                "server.port_attempts",
                "port_attempts must be greater than 0",
            ));
        }
    }

    fn validate_channel(config: &RelayConfig, result: &mut ValidationResult) {
        let relay = &config.relay;
        for (path, value) in [
            ("relay.heartbeat_interval_secs", relay.heartbeat_interval_secs),
            ("relay.heartbeat_timeout_secs", relay.heartbeat_timeout_secs),
            ("relay.screenshot_timeout_secs", relay.screenshot_timeout_secs),
            ("relay.auth_token_timeout_secs", relay.auth_token_timeout_secs),
        ] {
            if value == 0 {
                result.add_error(ValidationError::new(path, "must be greater than 0"));
            }
        }

        // One missed beat must not be fatal.
        if relay.heartbeat_timeout_secs <= relay.heartbeat_interval_secs * 2 {
            result.add_warning(ValidationWarning::new(
                "relay.heartbeat_timeout_secs",
                format!(
                    "heartbeat timeout ({}s) should exceed twice the interval ({}s)",
                    relay.heartbeat_timeout_secs, relay.heartbeat_interval_secs
                ),
            ));
        }

        if relay.max_pending_requests == 0 {
            result.add_error(ValidationError::new(
                "relay.max_pending_requests",
                "max_pending_requests must be greater than 0",
            ));
        }

        if relay.outbound_buffer == 0 {
            result.add_error(ValidationError::new(
                "relay.outbound_buffer",
                "outbound_buffer must be greater than 0",
            ));
        }
    }

    fn validate_logs(config: &RelayConfig, result: &mut ValidationResult) {
        if config.logs.log_limit == 0 {
            result.add_warning(ValidationWarning::new(
                "logs.log_limit",
                "log_limit is 0, extension logs will not be retained",
            ));
        }
    }

    fn validate_discovery(config: &RelayConfig, result: &mut ValidationResult) {
        let discovery = &config.discovery;
        if discovery.port == Some(0) {
            result.add_error(ValidationError::new("discovery.port", "Port cannot be 0"));
        }

        if discovery.probe_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "discovery.probe_timeout_ms",
                "probe_timeout_ms must be greater than 0",
            ));
        }

        if u32::from(discovery.fallback_start) + u32::from(discovery.fallback_count)
            > u32::from(u16::MAX) + 1
        {
            result.add_error(ValidationError::new(
                "discovery.fallback_count",
                "fallback port range exceeds 65535",
            ));
        }
    }

    fn validate_api(config: &RelayConfig, result: &mut ValidationResult) {
        if let Some(ref storage) = config.api.auth_storage_type {
            if let Err(message) = storage.parse::<StorageType>() {
                result.add_error(ValidationError::new("api.auth_storage_type", message));
            }
        }

        if let Some(ref url) = config.api.api_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "api.api_base_url",
                    "api_base_url must start with http:// or https://",
                ));
            }
        }
    }
}
