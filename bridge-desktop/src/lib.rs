//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `AuthSessionBrowser` using the system browser and a loopback listener
//! - `AlertPresenter` writing to stderr
//! - `ConfigSource` reading an `app.json` manifest
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{AppManifestSource, ConsoleAlertPresenter, LoopbackBrowserSession, ReqwestHttpClient};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let config_source = AppManifestSource::from_env()?;
//! let browser = LoopbackBrowserSession::new();
//! let alerts = ConsoleAlertPresenter::new();
//! ```

mod alert;
mod browser;
mod config;
mod http;

pub use alert::ConsoleAlertPresenter;
pub use browser::LoopbackBrowserSession;
pub use config::{AppManifestSource, CONFIG_PATH_ENV};
pub use http::ReqwestHttpClient;
