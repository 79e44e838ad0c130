use crate::services::AggregatorOptions;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub data_source: DataSourceSettings,
    #[serde(default)]
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub geocoding: GeocodingSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Which store backs the buyer and property tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Supabase,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default = "default_properties_table")]
    pub properties_table: String,
    #[serde(default = "default_buyers_table")]
    pub buyers_table: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            properties_table: default_properties_table(),
            buyers_table: default_buyers_table(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_properties_table() -> String { "property_listings".to_string() }
fn default_buyers_table() -> String { "buyers".to_string() }
fn default_request_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingSettings {
    /// Google Geocoding API key; without one only map links are parsed
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_geocode_concurrency")]
    pub concurrency: usize,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            timeout_secs: default_geocode_timeout(),
            concurrency: default_geocode_concurrency(),
        }
    }
}

fn default_geocode_timeout() -> u64 { 5 }
fn default_geocode_concurrency() -> usize { 8 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// L2 is skipped when unset
    pub redis_url: Option<String>,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_l1_size")]
    pub l1_cache_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_cache_ttl(),
            l1_cache_size: default_l1_size(),
        }
    }
}

fn default_cache_ttl() -> u64 { 86_400 }
fn default_l1_size() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Applies to the distribution variant only
    #[serde(default)]
    pub enable_distance_match: bool,
    #[serde(default = "default_radius_km")]
    pub distance_radius_km: f64,
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            enable_distance_match: false,
            distance_radius_km: default_radius_km(),
            deadline_secs: default_deadline(),
        }
    }
}

fn default_limit() -> usize { 50 }
fn default_max_limit() -> usize { 200 }
fn default_radius_km() -> f64 { 3.0 }
fn default_deadline() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ESTATE__)
    /// 5. Well-known variables such as DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ESTATE__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Parse settings from TOML text, without environment overrides
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Aggregator knobs derived from the matching, geocoding and data source sections
    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            deadline: Duration::from_secs(self.matching.deadline_secs),
            geocode_timeout: Duration::from_secs(self.geocoding.timeout_secs),
            geocode_concurrency: self.geocoding.concurrency,
            enable_distance_match: self.matching.enable_distance_match,
            distance_radius_km: self.matching.distance_radius_km,
            page_size: self.data_source.page_size,
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("ESTATE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply well-known environment variables on top of the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("SUPABASE_URL", "supabase.url"),
        ("SUPABASE_SERVICE_KEY", "supabase.service_key"),
        ("GOOGLE_MAPS_API_KEY", "geocoding.api_key"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            if !value.is_empty() {
                builder = builder.set_override(key, value)?;
            }
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.data_source.backend, Backend::Supabase);
        assert_eq!(settings.matching.default_limit, 50);
        assert_eq!(settings.matching.max_limit, 200);
        assert!(!settings.matching.enable_distance_match);
        assert_eq!(settings.matching.distance_radius_km, 3.0);
        assert_eq!(settings.supabase.buyers_table, "buyers");
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [data_source]
            backend = "postgres"

            [matching]
            enable_distance_match = true
            deadline_secs = 10

            [geocoding]
            timeout_secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(settings.data_source.backend, Backend::Postgres);
        assert_eq!(settings.data_source.page_size, 1000);
        assert_eq!(settings.server.host, "0.0.0.0");

        let options = settings.aggregator_options();
        assert!(options.enable_distance_match);
        assert_eq!(options.deadline, Duration::from_secs(10));
        assert_eq!(options.geocode_timeout, Duration::from_secs(2));
        assert_eq!(options.geocode_concurrency, 8);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Settings::from_toml("[data_source]\nbackend = \"mysql\"").is_err());
    }
}
