//! Server configuration read from the environment at startup.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crossroads_session::application::coordinator::CoordinatorConfig;
use crossroads_session::domain::state::SessionSettings;

use crate::error::AppError;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;
/// Default per-connection notification buffer.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Settings for one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// YAML story to serve; the bundled demo story when absent.
    pub story_path: Option<PathBuf>,
    /// Retained chat entries; unbounded when absent.
    pub chat_capacity: Option<NonZeroUsize>,
    /// Notifications buffered per WebSocket connection.
    pub subscriber_buffer: usize,
    /// OTLP collector endpoint for span export.
    pub otlp_endpoint: Option<String>,
}

impl ServerConfig {
    /// Reads `HOST`, `PORT`, `STORY_PATH`, `CHAT_CAPACITY`,
    /// `SUBSCRIBER_BUFFER` and `OTEL_EXPORTER_OTLP_ENDPOINT`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a value is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Blank
    /// values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a value is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let chat_capacity = var("CHAT_CAPACITY")
            .map(|raw| {
                raw.parse::<NonZeroUsize>().map_err(|e| {
                    AppError::Config(format!("CHAT_CAPACITY must be a positive integer: {e}"))
                })
            })
            .transpose()?;
        let subscriber_buffer = match var("SUBSCRIBER_BUFFER") {
            Some(raw) => raw
                .parse::<NonZeroUsize>()
                .map_err(|e| {
                    AppError::Config(format!("SUBSCRIBER_BUFFER must be a positive integer: {e}"))
                })?
                .get(),
            None => DEFAULT_SUBSCRIBER_BUFFER,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port,
            story_path: var("STORY_PATH").map(PathBuf::from),
            chat_capacity,
            subscriber_buffer,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host:port` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Coordinator settings derived from this configuration.
    #[must_use]
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            session: SessionSettings {
                chat_capacity: self.chat_capacity,
            },
            subscriber_buffer: self.subscriber_buffer,
            ..CoordinatorConfig::default()
        }
    }
}
