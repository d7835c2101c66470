//! Host environment and startup configuration source.
//!
//! Both are read once at startup. The environment describes where the app is
//! running (platform, which client binary hosts it) and the configuration
//! source exposes the static `extra` bundle the app was built with.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::platform::PlatformSendSync;

/// Operating platform of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
    Desktop,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
            Platform::Desktop => "desktop",
        }
    }

    /// Whether this is a mobile-native platform.
    pub fn is_native_mobile(&self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which binary hosts the app bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppOwnership {
    /// A generic sandbox client that loads arbitrary bundles. Native OAuth
    /// client configurations are unavailable here.
    Sandbox,
    /// A standalone or development build of the app itself.
    #[default]
    Standalone,
}

/// Describes the running host.
pub trait HostEnvironment: PlatformSendSync {
    fn platform(&self) -> Platform;

    fn app_ownership(&self) -> AppOwnership;

    /// Redirect URI registered for the app's own scheme.
    fn redirect_uri(&self) -> String;

    /// Redirect URI routed through the sandbox auth proxy, if the host has one.
    fn proxy_redirect_uri(&self) -> Option<String> {
        None
    }
}

/// Fixed environment description, useful for desktop shells and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEnvironment {
    pub platform: Platform,
    pub app_ownership: AppOwnership,
    pub redirect_uri: String,
    pub proxy_redirect_uri: Option<String>,
}

impl StaticEnvironment {
    pub fn new(platform: Platform, redirect_uri: impl Into<String>) -> Self {
        Self {
            platform,
            app_ownership: AppOwnership::Standalone,
            redirect_uri: redirect_uri.into(),
            proxy_redirect_uri: None,
        }
    }

    pub fn with_ownership(mut self, ownership: AppOwnership) -> Self {
        self.app_ownership = ownership;
        self
    }

    pub fn with_proxy_redirect(mut self, uri: impl Into<String>) -> Self {
        self.proxy_redirect_uri = Some(uri.into());
        self
    }
}

impl HostEnvironment for StaticEnvironment {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn app_ownership(&self) -> AppOwnership {
        self.app_ownership
    }

    fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    fn proxy_redirect_uri(&self) -> Option<String> {
        self.proxy_redirect_uri.clone()
    }
}

/// Source of the static `extra` configuration bundle.
///
/// Hosts expose up to two copies: the current app-config block and the
/// legacy manifest block. The core prefers the former.
pub trait ConfigSource: PlatformSendSync {
    fn app_config_extra(&self) -> Option<serde_json::Value>;

    fn manifest_extra(&self) -> Option<serde_json::Value> {
        None
    }
}
