//! # Relay Config
//!
//! Configuration management for the browser relay: TOML schema with defaults,
//! `${VAR}` expansion, environment overrides and validation.

mod env;
mod error;
mod loader;
mod schema;
mod validator;

pub use env::EnvOverrides;
pub use error::ConfigError;
pub use loader::{ConfigLoader, read_port_file, write_port_file};
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
