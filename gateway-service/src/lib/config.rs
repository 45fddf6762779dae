use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    pub session: SessionConfig,
    pub tenants: Vec<TenantCredential>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    /// Minutes a generated passcode stays valid
    pub validity_minutes: i64,
    /// Attempts allowed on the standalone OTP API (the chat wizard always
    /// uses a single attempt)
    pub standalone_max_attempts: i32,
    /// Requests allowed per identifier per window
    pub rate_limit_max_requests: u32,
    /// Sliding rate-limit window, minutes
    pub rate_limit_window_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Guest session TTL, refreshed on activity
    pub ttl_minutes: i64,
    /// Cadence of the maintenance sweep
    pub cleanup_interval_minutes: u64,
}

/// Client credentials for one downstream tenant service.
#[derive(Debug, Deserialize, Clone)]
pub struct TenantCredential {
    pub client_id: String,
    pub client_secret: String,
    pub service_name: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}
