use crate::auth::{MAX_HASH_COST, MIN_HASH_COST};
use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Serve from the in-process store instead of Postgres
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Credential issuance settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct AuthSettings {
    pub signing_key: String,
    pub access_token_ttl_seconds: i64,  // 900 = 15 minutes
    pub refresh_token_ttl_seconds: i64, // 604800 = 7 days
    /// Replace the refresh credential on every successful refresh
    pub rotate_refresh_tokens: bool,
    /// bcrypt cost for passwords and refresh credentials
    pub hash_cost: u32,
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_ttl_seconds)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_ttl_seconds)
    }
}

/// Token bucket for unauthenticated endpoints
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RateLimitSettings {
    /// Sustained refill rate
    pub requests_per_second: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl Settings {
    /// Rejects settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.signing_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.signing_key".to_string()));
        }
        if self.auth.access_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.access_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if self.auth.refresh_token_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh_token_ttl_seconds must be positive".to_string(),
            ));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.auth.hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.hash_cost must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        if !(self.rate_limit.requests_per_second > 0.0) {
            return Err(ConfigError::InvalidValue(
                "rate_limit.requests_per_second must be positive".to_string(),
            ));
        }
        if self.rate_limit.burst == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.burst must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads `configuration.yaml` (optional) and `APP_*` environment variables,
/// e.g. `APP_AUTH__SIGNING_KEY`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("application.in_memory", false)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "password")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.database_name", "tokengate")?
        .set_default("database.max_connections", 10)?
        .set_default("auth.signing_key", "")?
        .set_default("auth.access_token_ttl_seconds", 900)?
        .set_default("auth.refresh_token_ttl_seconds", 604_800)?
        .set_default("auth.rotate_refresh_tokens", false)?
        .set_default("auth.hash_cost", bcrypt::DEFAULT_COST)?
        .set_default("rate_limit.requests_per_second", 1.0)?
        .set_default("rate_limit.burst", 5)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
