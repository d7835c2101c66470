//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sign-in core:
//! - Startup configuration resolution
//! - Logging and tracing infrastructure
//! - Event bus system
//!
//! ## Overview
//!
//! Everything here is resolved or installed once at process start and shared
//! read-only afterwards. The auth crate and the service façade depend on it;
//! it depends only on the bridge contracts.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AppConfig, FirebaseOptions, GoogleAuthConfig};
pub use error::{Error, Result};
