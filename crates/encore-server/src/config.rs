//! Server configuration loaded from environment variables.
//!
//! Optional variables:
//! - `ENCORE_HOST` -- bind address (default `0.0.0.0`)
//! - `ENCORE_PORT` -- TCP port (default `8080`)
//! - `DATABASE_URL` -- `PostgreSQL` connection string; when absent the
//!   server runs on the in-memory ledger

/// Default bind address.
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port.
const DEFAULT_PORT: u16 = 8080;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid {var}: {reason}")]
    Invalid {
        /// The offending variable name.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to.
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
    /// `PostgreSQL` connection URL; `None` selects the in-memory
    /// ledger backend.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `ENCORE_PORT` is not a valid
    /// port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("ENCORE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());

        let port = match std::env::var("ENCORE_PORT") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var: "ENCORE_PORT",
                reason: format!("{e}"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let database_url = std::env::var("DATABASE_URL").ok();

        Ok(Self {
            host,
            port,
            database_url,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            database_url: None,
        }
    }
}
