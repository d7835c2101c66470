//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the sign-in core and the host that
//! embeds it. Each trait represents a capability the core needs but that is
//! implemented differently per platform (desktop, iOS, Android, web).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP for the session backend
//!
//! ### Interaction
//! - [`AuthSessionBrowser`](browser::AuthSessionBrowser) - Interactive OAuth prompt
//! - [`AlertPresenter`](alert::AlertPresenter) - Blocking informational alerts
//!
//! ### Startup
//! - [`HostEnvironment`](environment::HostEnvironment) - Platform and client-binary description
//! - [`ConfigSource`](environment::ConfigSource) - Static configuration bundle
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when startup requirements are
//! missing, before any screen is mounted:
//!
//! ```ignore
//! let config = AppConfig::resolve(config_source.as_ref())?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! keep messages actionable.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` on native targets (see
//! [`PlatformSendSync`](platform::PlatformSendSync)) so handles can be shared
//! across async tasks.

pub mod alert;
pub mod browser;
pub mod environment;
pub mod error;
pub mod http;
pub mod platform;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use alert::{Alert, AlertPresenter};
pub use browser::{AuthSessionBrowser, AuthSessionOptions, BrowserResult};
pub use environment::{AppOwnership, ConfigSource, HostEnvironment, Platform, StaticEnvironment};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use time::{Clock, SystemClock};
