//! Configuration management for the sales tracker
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with SALES__ prefix

use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Push gateway configuration
    pub push: PushConfig,

    /// Scheduled job configuration
    pub schedule: ScheduleConfig,

    /// Uploaded photo storage
    pub uploads: UploadConfig,

    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
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
pub struct PushConfig {
    /// Base URL of the web push gateway; push is disabled when unset
    pub gateway_url: Option<String>,

    /// API key sent to the gateway
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// IANA timezone used for day boundaries and job times
    pub timezone: String,

    /// Local time of the daily sales report, `HH:MM`
    pub daily_report_time: String,

    /// Bearer secret for the external cron trigger
    pub cron_secret: Option<String>,

    /// Run the in-process scheduler
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Directory photos are written to
    pub dir: String,

    /// Maximum multipart body size in bytes
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorsConfig {
    /// Allowed frontend origin; any origin when unset
    pub frontend_url: Option<String>,
}

impl ScheduleConfig {
    /// Parsed timezone
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Message(format!("invalid schedule.timezone: {}", e)))
    }

    /// Parsed daily report time
    pub fn report_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.daily_report_time, "%H:%M").map_err(|e| {
            ConfigError::Message(format!("invalid schedule.daily_report_time: {}", e))
        })
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("SALES_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 18000)?
            .set_default("push.timeout_secs", 10)?
            .set_default("schedule.timezone", "Asia/Jakarta")?
            .set_default("schedule.daily_report_time", "17:00")?
            .set_default("schedule.enabled", true)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_body_bytes", 25 * 1024 * 1024)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SALES__ prefix)
            .add_source(
                Environment::with_prefix("SALES")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;

        // Fail at startup rather than inside a job
        config.schedule.tz()?;
        config.schedule.report_time()?;

        Ok(config)
    }
}
