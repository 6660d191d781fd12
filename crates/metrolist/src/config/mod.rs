use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use url::Url;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub search: SearchConfig,
    pub sources: SourceConfig,
}

pub use crate::workflows::search::DEFAULT_PAGE_SIZE;
pub const DEFAULT_STATE_PATH: &str = ".metrolist-state.json";

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let page_size = match env::var("METROLIST_PAGE_SIZE") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidPageSize { value: raw }),
            },
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let state_path = env::var("METROLIST_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH));

        let listings = optional_source("METROLIST_LISTINGS_SOURCE")?;
        let ami_table = optional_source("METROLIST_AMI_SOURCE")?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            search: SearchConfig {
                page_size,
                state_path,
            },
            sources: SourceConfig {
                listings,
                ami_table,
            },
        })
    }
}

fn optional_source(variable: &'static str) -> Result<Option<SourceLocation>, ConfigError> {
    match env::var(variable) {
        Ok(raw) if !raw.trim().is_empty() => SourceLocation::parse(&raw)
            .map(Some)
            .map_err(|source| ConfigError::InvalidSource { variable, source }),
        _ => Ok(None),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Pagination and persisted-session settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub page_size: usize,
    pub state_path: PathBuf,
}

/// Where listings and the AMI table are fetched from.
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    pub listings: Option<SourceLocation>,
    pub ami_table: Option<SourceLocation>,
}

/// Remote endpoint or local file backing a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(Url),
    File(PathBuf),
}

impl SourceLocation {
    /// Values starting with `http://` or `https://` are endpoints; anything else is a path.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Url::parse(trimmed).map(Self::Http)
        } else {
            Ok(Self::File(PathBuf::from(trimmed)))
        }
    }

    pub fn is_csv(&self) -> bool {
        let path = match self {
            SourceLocation::Http(url) => url.path().to_string(),
            SourceLocation::File(path) => path.to_string_lossy().into_owned(),
        };
        path.to_ascii_lowercase().ends_with(".csv")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Http(url) => write!(f, "{url}"),
            SourceLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidPageSize {
        value: String,
    },
    InvalidSource {
        variable: &'static str,
        source: url::ParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPageSize { value } => write!(
                f,
                "METROLIST_PAGE_SIZE must be a positive integer (got '{value}')"
            ),
            ConfigError::InvalidSource { variable, .. } => {
                write!(f, "{variable} must be a valid http(s) URL or file path")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPageSize { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidSource { source, .. } => Some(source),
        }
    }
}

/// Serializes tests that mutate process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("METROLIST_PAGE_SIZE");
        env::remove_var("METROLIST_STATE_PATH");
        env::remove_var("METROLIST_LISTINGS_SOURCE");
        env::remove_var("METROLIST_AMI_SOURCE");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.search.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.search.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert!(config.sources.listings.is_none());
        assert!(config.sources.ami_table.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_page_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("METROLIST_PAGE_SIZE", "0");
        let err = AppConfig::load().expect_err("zero page size rejected");
        assert!(matches!(err, ConfigError::InvalidPageSize { .. }));
        reset_env();
    }

    #[test]
    fn classifies_sources_by_scheme() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(
            "METROLIST_LISTINGS_SOURCE",
            "https://data.example.org/metrolist/developments",
        );
        env::set_var("METROLIST_AMI_SOURCE", "fixtures/ami.csv");
        let config = AppConfig::load().expect("config loads");
        assert!(matches!(
            config.sources.listings,
            Some(SourceLocation::Http(_))
        ));
        let ami = config.sources.ami_table.expect("ami source configured");
        assert_eq!(ami, SourceLocation::File(PathBuf::from("fixtures/ami.csv")));
        assert!(ami.is_csv());
        reset_env();
    }

    #[test]
    fn rejects_malformed_urls() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("METROLIST_LISTINGS_SOURCE", "http://");
        let err = AppConfig::load().expect_err("malformed url rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidSource {
                variable: "METROLIST_LISTINGS_SOURCE",
                ..
            }
        ));
        reset_env();
    }
}
