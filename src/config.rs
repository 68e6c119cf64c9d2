//! Configuration management for twin-ftp
//!
//! The server reads its settings from built-in defaults, an optional TOML
//! file, and `TWIN_FTP_*` environment variables, in that order of
//! precedence. The client is configured from its command line.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "twin-ftp";

/// Environment prefix, e.g. `TWIN_FTP_UPLOAD_DIR=/srv/ftp`.
pub const ENV_PREFIX: &str = "TWIN_FTP";

pub const DEFAULT_CONTROL_PORT: u16 = 12000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_ACCEPT_TIMEOUT_SECS: u64 = 10;

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address to bind the control listener
    pub bind_address: String,

    /// Port for the control channel
    pub control_port: u16,

    /// Directory served by GET and LS and written by PUT
    pub upload_dir: String,

    /// Maximum concurrent sessions
    pub max_clients: usize,

    /// Timeout for dialing a client's data port
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            max_clients: 10,
            connect_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// With `path` set the file must exist; otherwise `twin-ftp.toml` is read
    /// if present.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", i64::from(defaults.control_port))?
            .set_default("upload_dir", defaults.upload_dir)?
            .set_default("max_clients", defaults.max_clients as i64)?
            .set_default("connect_timeout_secs", defaults.connect_timeout_secs as i64)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.upload_dir.is_empty() {
            return Err(config::ConfigError::Message(
                "upload_dir cannot be empty".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and control port as socket address
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    pub fn upload_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }

    /// Get the data connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where GET writes downloads and PUT reads uploads from
    pub local_dir: PathBuf,

    /// How long to wait for the server to dial the data port
    pub accept_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("."),
            accept_timeout: Duration::from_secs(DEFAULT_ACCEPT_TIMEOUT_SECS),
        }
    }
}
