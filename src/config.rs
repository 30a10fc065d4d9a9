//! Process configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server
//! starts. After that it is read-only.
//!
//! ## Variables
//!
//! - `LISTEN` - Bind address of the demo server (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level or filter directive (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `HTTPLOG_MAX_BODY_LOG` - Body bytes attached to a log event (default: 24576)
//! - `HTTPLOG_STACK_SKIP` - Innermost frames dropped from panic stacks (default: 3)
//! - `HTTPLOG_REQUEST_ID_HEADER` - Header carrying the request id (default: `x-request-id`)

use anyhow::{Context, Result};
use http::HeaderName;
use std::env;

use crate::middleware::headers::DEFAULT_REQUEST_ID_HEADER;
use crate::middleware::{DEFAULT_MAX_BODY_LOG, DEFAULT_STACK_SKIP, RequestLogConfig};

/// Largest accepted `HTTPLOG_MAX_BODY_LOG` (16 MiB).
const MAX_BODY_LOG_LIMIT: usize = 16 * 1024 * 1024;

/// Largest accepted `HTTPLOG_STACK_SKIP`.
const STACK_SKIP_LIMIT: usize = 64;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: String,
    /// Cap on body bytes attached to a log event; larger bodies are truncated.
    pub max_body_log: usize,
    /// Frames dropped from the top of a recovered panic's stack.
    pub stack_skip: usize,
    pub request_id_header: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            max_body_log: DEFAULT_MAX_BODY_LOG,
            stack_skip: DEFAULT_STACK_SKIP,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let listen_addr = env::var("LISTEN").unwrap_or(defaults.listen_addr);
        let log_level = env::var("RUST_LOG").unwrap_or(defaults.log_level);
        let log_format = env::var("LOG_FORMAT").unwrap_or(defaults.log_format);

        let max_body_log = parse_var("HTTPLOG_MAX_BODY_LOG")?.unwrap_or(defaults.max_body_log);
        let stack_skip = parse_var("HTTPLOG_STACK_SKIP")?.unwrap_or(defaults.stack_skip);

        let request_id_header =
            env::var("HTTPLOG_REQUEST_ID_HEADER").unwrap_or(defaults.request_id_header);

        Ok(Self {
            listen_addr,
            log_level,
            log_format,
            max_body_log,
            stack_skip,
            request_id_header,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_body_log` is 0 or larger than 16 MiB
    /// - `stack_skip` is larger than 64
    /// - `request_id_header` is not a valid header name
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` is not `host:port`
    pub fn validate(&self) -> Result<()> {
        if self.max_body_log == 0 {
            anyhow::bail!("HTTPLOG_MAX_BODY_LOG must be greater than 0");
        }

        if self.max_body_log > MAX_BODY_LOG_LIMIT {
            anyhow::bail!(
                "HTTPLOG_MAX_BODY_LOG is too large (max: {}), got {}",
                MAX_BODY_LOG_LIMIT,
                self.max_body_log
            );
        }

        if self.stack_skip > STACK_SKIP_LIMIT {
            anyhow::bail!(
                "HTTPLOG_STACK_SKIP must be at most {}, got {}",
                STACK_SKIP_LIMIT,
                self.stack_skip
            );
        }

        self.header_name()?;

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        Ok(())
    }

    /// Builds the request logging middleware settings.
    ///
    /// Policy, sink and clock keep their defaults; callers override them on
    /// the returned value.
    ///
    /// # Errors
    ///
    /// Returns an error if `request_id_header` is not a valid header name.
    pub fn request_log(&self) -> Result<RequestLogConfig> {
        Ok(RequestLogConfig::new()
            .max_body_log(self.max_body_log)
            .stack_skip(self.stack_skip)
            .request_id_header(self.header_name()?))
    }

    fn header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.request_id_header.to_ascii_lowercase().as_bytes())
            .with_context(|| {
                format!(
                    "HTTPLOG_REQUEST_ID_HEADER is not a valid header name: '{}'",
                    self.request_id_header
                )
            })
    }

    /// Prints configuration summary.
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Max body log: {} bytes", self.max_body_log);
        tracing::info!("  Stack skip: {} frames", self.stack_skip);
        tracing::info!("  Request id header: {}", self.request_id_header);
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} must be a number, got '{raw}'")),
        Err(_) => Ok(None),
    }
}
