//! Configuration loading and constants.
//!
//! Loads the listener configuration from a TOML file, layers environment and
//! command-line overrides on top, and validates the result before the server
//! starts. `AppConfig` is the root configuration struct containing all settings.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use const_format::formatcp;
use serde::Deserialize;

// =============================================================================
// HTTP Listener Defaults
// =============================================================================

/// Default bind address (all interfaces)
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default listening port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Seconds to wait for in-flight requests after SIGTERM/SIGINT
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Responses are never cacheable: every trigger must reach the listener
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

/// Header carrying the per-request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// Deploy Endpoint Defaults
// =============================================================================

/// Path that accepts deployment triggers
pub const DEFAULT_DEPLOY_PATH: &str = "/deploy";

/// Program used to run the deployment script
pub const DEFAULT_INTERPRETER: &str = "bash";

/// Upper bound for a trigger body. The payload is a tiny JSON object.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Value of the `status` field in the success response
pub const DEPLOYING_STATUS: &str = "deploying";

/// Success response body, byte for byte: `{"status": "deploying"}`
pub const DEPLOYING_BODY: &str = formatcp!(r#"{{"status": "{}"}}"#, DEPLOYING_STATUS);

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path, used only if present
pub const DEFAULT_CONFIG_PATH: &str = "config/deployhook.toml";

/// Default log filter when neither --log-level nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = formatcp!("{}=info", env!("CARGO_CRATE_NAME"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Deploy endpoint and script configuration
    #[serde(default)]
    pub deploy: DeployConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Grace period for draining connections on shutdown
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }

    /// Resolve host and port into a bindable socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|e| {
            ConfigError::Validation(format!("Invalid http.host '{}': {}", self.host, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Deploy endpoint configuration.
///
/// `Debug` is implemented by hand so the shared secret never reaches the logs.
#[derive(Clone, Deserialize)]
pub struct DeployConfig {
    /// Request path that triggers a deployment
    #[serde(default = "DeployConfig::default_path")]
    pub path: String,
    /// Shared secret callers must present in the `secret` field
    #[serde(default)]
    pub secret: String,
    /// Deployment script, passed to the interpreter
    #[serde(default)]
    pub script: PathBuf,
    /// Program that runs the script
    #[serde(default = "DeployConfig::default_interpreter")]
    pub interpreter: String,
    /// Maximum accepted request body size
    #[serde(default = "DeployConfig::default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            secret: String::new(),
            script: PathBuf::new(),
            interpreter: Self::default_interpreter(),
            max_body_bytes: Self::default_max_body_bytes(),
        }
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("path", &self.path)
            .field("secret", &"<redacted>")
            .field("script", &self.script)
            .field("interpreter", &self.interpreter)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl DeployConfig {
    fn default_path() -> String {
        DEFAULT_DEPLOY_PATH.to_string()
    }

    fn default_interpreter() -> String {
        DEFAULT_INTERPRETER.to_string()
    }

    fn default_max_body_bytes() -> usize {
        DEFAULT_MAX_BODY_BYTES
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Values that take precedence over the config file.
///
/// Populated from command-line flags, which clap falls back to environment
/// variables for.
#[derive(Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secret: Option<String>,
    pub script: Option<PathBuf>,
    pub log_format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load an explicitly requested file, or the default file if it exists.
    ///
    /// An explicit path that cannot be read is an error. A missing default
    /// file falls back to built-in defaults so the listener can be configured
    /// purely through the environment.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.http.host = host;
        }
        if let Some(port) = overrides.port {
            self.http.port = port;
        }
        if let Some(secret) = overrides.secret {
            self.deploy.secret = secret;
        }
        if let Some(script) = overrides.script {
            self.deploy.script = script;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    /// Check that the merged configuration can serve requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deploy.secret.is_empty() {
            return Err(ConfigError::Validation(
                "No deploy secret configured. Set deploy.secret, --secret or DEPLOYHOOK_SECRET"
                    .to_string(),
            ));
        }
        if self.deploy.script.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "No deploy script configured. Set deploy.script, --script or DEPLOYHOOK_SCRIPT"
                    .to_string(),
            ));
        }
        if self.deploy.interpreter.is_empty() {
            return Err(ConfigError::Validation(
                "deploy.interpreter must not be empty".to_string(),
            ));
        }
        if !self.deploy.path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "deploy.path must start with '/', got '{}'",
                self.deploy.path
            )));
        }
        if self.deploy.path.contains(['{', '}', '*', ':']) {
            return Err(ConfigError::Validation(format!(
                "deploy.path must be a literal path without captures, got '{}'",
                self.deploy.path
            )));
        }
        if self.deploy.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "deploy.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.http.socket_addr()?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
