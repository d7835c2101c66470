//! # Logging
//!
//! Installs the process-wide `tracing` subscriber for sign-in hosts and
//! provides the redaction helper that call sites use for token and email
//! fields.
//!
//! ```no_run
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! # fn main() -> core_runtime::Result<()> {
//! init_logging(LoggingConfig::from_env().with_format(LogFormat::Compact))?;
//! tracing::info!("Host started");
//! # Ok(())
//! # }
//! ```
//!
//! `SIGNIN_LOG` overrides the filter with any `EnvFilter` directive string and
//! `SIGNIN_LOG_FORMAT` selects `pretty`, `json` or `compact`.

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::io;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding a filter directive string.
pub const LOG_FILTER_ENV: &str = "SIGNIN_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "SIGNIN_LOG_FORMAT";

const REDACTED: &str = "[REDACTED]";

/// Field names whose values are never logged.
const SECRET_FIELDS: &[&str] = &[
    "token",
    "nonce",
    "state",
    "api_key",
    "credential",
    "post_body",
    "secret",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the workspace crates when no filter is given
    pub level: Level,
    /// Full `EnvFilter` directive string; replaces the level-based default
    pub filter: Option<String>,
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by [`LOG_FILTER_ENV`] and [`LOG_FORMAT_ENV`].
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup.
    ///
    /// An unrecognized format keeps the default format.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|f| !f.trim().is_empty()) {
            config.filter = Some(filter);
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).and_then(|f| f.parse().ok()) {
            config.format = format;
        }
        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    fn directives(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => {
                let level = self.level.to_string().to_ascii_lowercase();
                ["core_runtime", "core_auth", "core_service", "bridge_desktop"]
                    .iter()
                    .fold("warn".to_string(), |acc, krate| {
                        format!("{},{}={}", acc, krate, level)
                    })
            }
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// [`Error::Config`] when the filter does not parse, [`Error::Internal`] when a
/// global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;
    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_writer(io::stderr);

    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt.pretty()).try_init(),
        LogFormat::Json => registry
            .with(fmt.json().flatten_event(true).with_current_span(true))
            .try_init(),
        LogFormat::Compact => registry.with(fmt.compact()).try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))
}

/// Value of `field` as it may appear in a log line.
///
/// Tokens, nonces and keys become `[REDACTED]`. Email addresses keep their
/// first character and domain. Everything else passes through.
///
/// ```
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("id_token", "eyJhbGci"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("email", "hanako@example.com"), "h***@example.com");
/// assert_eq!(redact_if_sensitive("uid", "u-1"), "u-1");
/// ```
pub fn redact_if_sensitive<'a>(field: &str, value: &'a str) -> Cow<'a, str> {
    let field = field.to_ascii_lowercase();
    if SECRET_FIELDS.iter().any(|secret| field.contains(secret)) {
        return Cow::Borrowed(REDACTED);
    }
    if field.contains("email") || value.contains('@') {
        return Cow::Owned(mask_email(value));
    }
    Cow::Borrowed(value)
}

fn mask_email(value: &str) -> String {
    match value.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None if value.is_empty() => String::new(),
        None => REDACTED.to_string(),
    }
}
