//! Configuration management for the plate warehouse server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PWM__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::UnknownOperatorPolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Warehouse rules and account defaults
    pub warehouse: WarehouseConfig,

    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    /// Hours east of UTC for every stored timestamp
    pub utc_offset_hours: i32,

    /// Threshold for new inventory lines when the inbound omits one
    pub default_warning_threshold: i32,

    /// What to do with an operator name that matches no account
    pub unknown_operator_policy: UnknownOperatorPolicy,

    /// Initial password of auto-provisioned operator accounts
    pub provisioned_password: String,

    /// Password of the `admin` account created on an empty database
    pub bootstrap_admin_password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins; empty or `*` allows any
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PWM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 604800)?
            .set_default("warehouse.utc_offset_hours", shared::DEFAULT_UTC_OFFSET_HOURS)?
            .set_default(
                "warehouse.default_warning_threshold",
                shared::DEFAULT_WARNING_THRESHOLD,
            )?
            .set_default("warehouse.unknown_operator_policy", "provision")?
            .set_default("warehouse.provisioned_password", "123456")?
            .set_default("warehouse.bootstrap_admin_password", "admin123")?
            .set_default("cors.allowed_origins", vec!["*".to_string()])?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PWM__ prefix)
            .add_source(
                Environment::with_prefix("PWM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
