use crate::valuation::engine::{InvalidParameter, ValuationConfig};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

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
    pub valuation: ValuationConfig,
    /// CSV of comparable sales backing the comparable source, when configured.
    pub comparables_csv: Option<PathBuf>,
}

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

        let valuation = match non_empty_var("APP_VALUATION_PARAMETERS") {
            Some(path) => load_valuation_parameters(Path::new(&path))?,
            None => ValuationConfig::default(),
        };

        let comparables_csv = non_empty_var("APP_COMPARABLES_CSV").map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            valuation,
            comparables_csv,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Reads a JSON parameter set; omitted fields keep their documented defaults.
pub fn load_valuation_parameters(path: &Path) -> Result<ValuationConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ParametersUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ValuationConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::ParametersMalformed {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    ParametersUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    ParametersMalformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidParameter(InvalidParameter),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::ParametersUnreadable { path, .. } => {
                write!(f, "unable to read valuation parameters at {}", path.display())
            }
            ConfigError::ParametersMalformed { path, .. } => {
                write!(f, "valuation parameters at {} are not valid JSON", path.display())
            }
            ConfigError::InvalidParameter(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::ParametersUnreadable { source, .. } => Some(source),
            ConfigError::ParametersMalformed { source, .. } => Some(source),
            ConfigError::InvalidParameter(err) => Some(err),
        }
    }
}

impl From<InvalidParameter> for ConfigError {
    fn from(value: InvalidParameter) -> Self {
        Self::InvalidParameter(value)
    }
}
