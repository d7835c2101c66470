//! # Startup Configuration
//!
//! Resolves the static configuration bundle the app was built with.
//!
//! ## Overview
//!
//! The host exposes the bundle through a [`ConfigSource`]. The bundle carries
//! two sections:
//!
//! - `firebase` (mandatory) - connection parameters for the auth backend
//! - `googleAuth` (optional) - OAuth client identifiers per platform
//!
//! Resolution is fail-fast: a bundle without a usable `firebase` section
//! aborts startup with a descriptive error. Missing OAuth identifiers only
//! disable the sign-in feature on the affected platform.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::from_json(
//!     r#"{
//!         "firebase": { "apiKey": "AIza-test", "projectId": "demo" },
//!         "googleAuth": { "iosClientId": "ios.apps.googleusercontent.com" }
//!     }"#,
//! )
//! .expect("valid config");
//!
//! assert_eq!(config.firebase.project_id.as_deref(), Some("demo"));
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::AppConfig;
//!
//! // No `firebase` section: startup must not continue.
//! AppConfig::from_json(r#"{ "googleAuth": {} }"#).expect("missing firebase section");
//! ```

use crate::error::{Error, Result};
use bridge_traits::environment::{AppOwnership, ConfigSource, Platform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message reported when the mandatory backend section is absent.
pub const MISSING_FIREBASE_MESSAGE: &str =
    "Firebase config is not defined under expo.extra.firebase";

/// Connection parameters for the Firebase project.
///
/// Field names follow the wire format of the web SDK configuration object.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    /// Web API key used on every Identity Toolkit request
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub measurement_id: Option<String>,
}

impl FirebaseOptions {
    /// Validates that the section can be used to reach the backend.
    pub fn validate(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(Error::Config(
                "Firebase config is missing a non-empty apiKey".to_string(),
            )),
        }
    }

    /// The API key. Only meaningful after [`validate`](Self::validate) succeeded.
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }
}

// The API key is not a secret for Firebase web apps, but it is still noise in logs.
impl fmt::Debug for FirebaseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("messaging_sender_id", &self.messaging_sender_id)
            .field("app_id", &self.app_id)
            .field("measurement_id", &self.measurement_id)
            .finish()
    }
}

/// OAuth client identifiers for Google sign-in, keyed by platform.
///
/// Every identifier is optional; an absent one means Google sign-in is not
/// available on that platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthConfig {
    /// Client used when running inside the sandbox client
    pub expo_client_id: Option<String>,
    pub ios_client_id: Option<String>,
    pub android_client_id: Option<String>,
    pub web_client_id: Option<String>,
}

impl GoogleAuthConfig {
    /// Selects the client identifier for the running host.
    ///
    /// # Examples
    ///
    /// ```
    /// use bridge_traits::environment::{AppOwnership, Platform};
    /// use core_runtime::config::GoogleAuthConfig;
    ///
    /// let config = GoogleAuthConfig {
    ///     ios_client_id: Some("ios-id".to_string()),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(config.client_id_for(Platform::Ios, AppOwnership::Standalone), Some("ios-id"));
    /// assert_eq!(config.client_id_for(Platform::Ios, AppOwnership::Sandbox), None);
    /// ```
    pub fn client_id_for(&self, platform: Platform, ownership: AppOwnership) -> Option<&str> {
        let id = match (ownership, platform) {
            (AppOwnership::Sandbox, _) => self.expo_client_id.as_deref(),
            (AppOwnership::Standalone, Platform::Ios) => self.ios_client_id.as_deref(),
            (AppOwnership::Standalone, Platform::Android) => self.android_client_id.as_deref(),
            (AppOwnership::Standalone, Platform::Web | Platform::Desktop) => {
                self.web_client_id.as_deref()
            }
        };
        id.filter(|id| !id.trim().is_empty())
    }

    /// Whether the sandbox client identifier is configured.
    pub fn has_sandbox_client(&self) -> bool {
        self.expo_client_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// The `extra` block exactly as the host ships it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtraConfig {
    firebase: Option<FirebaseOptions>,
    google_auth: Option<GoogleAuthConfig>,
}

/// Immutable, process-lifetime configuration bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend connection parameters (validated)
    pub firebase: FirebaseOptions,
    /// Per-platform OAuth client identifiers
    pub google_auth: Option<GoogleAuthConfig>,
}

impl AppConfig {
    /// Resolves the bundle from the host.
    ///
    /// The app-config `extra` block wins whenever the host provides one; the
    /// legacy manifest block is consulted only when it is absent.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when no `firebase` section is present
    /// - `Error::Config` when the `firebase` section has no API key
    /// - `Error::Config` when the block is not shaped like a config bundle
    pub fn resolve(source: &dyn ConfigSource) -> Result<Self> {
        let extra = source
            .app_config_extra()
            .or_else(|| source.manifest_extra())
            .ok_or_else(|| Error::Config(MISSING_FIREBASE_MESSAGE.to_string()))?;

        Self::from_extra(extra)
    }

    /// Builds the bundle from an already-extracted `extra` object.
    pub fn from_extra(extra: serde_json::Value) -> Result<Self> {
        let extra: ExtraConfig = serde_json::from_value(extra)
            .map_err(|e| Error::Config(format!("Invalid app config: {}", e)))?;

        let firebase = extra
            .firebase
            .ok_or_else(|| Error::Config(MISSING_FIREBASE_MESSAGE.to_string()))?;
        firebase.validate()?;

        Ok(Self {
            firebase,
            google_auth: extra.google_auth,
        })
    }

    /// Parses an `extra` object from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid app config JSON: {}", e)))?;
        Self::from_extra(value)
    }

    /// OAuth identifiers, or an empty set when the section is absent.
    pub fn google_auth(&self) -> GoogleAuthConfig {
        self.google_auth.clone().unwrap_or_default()
    }
}
