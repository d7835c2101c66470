//! Configuration source backed by an `app.json` style manifest.

use bridge_traits::{
    environment::ConfigSource,
    error::{BridgeError, Result},
};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Environment variable that may point at the manifest file.
pub const CONFIG_PATH_ENV: &str = "SIGNIN_APP_CONFIG";

/// Reads the `extra` block of an app manifest.
///
/// Accepts both `{ "expo": { "extra": { .. } } }` and a bare
/// `{ "extra": { .. } }` document. A separately supplied legacy manifest is
/// exposed as the fallback block.
#[derive(Debug, Clone, Default)]
pub struct AppManifestSource {
    app_config: Option<Value>,
    manifest: Option<Value>,
}

impl AppManifestSource {
    /// Parse manifest JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid app manifest: {}", e)))?;

        Ok(Self {
            app_config: extract_extra(&document),
            manifest: None,
        })
    }

    /// Read and parse a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded app manifest");
        Self::from_json(&json)
    }

    /// Read the manifest named by [`CONFIG_PATH_ENV`], falling back to
    /// `app.json` in the working directory.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "app.json".to_string());
        Self::from_path(path)
    }

    /// Attach a legacy manifest document used when the primary block is absent.
    pub fn with_manifest(mut self, manifest_json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(manifest_json).map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid legacy manifest: {}", e))
        })?;
        self.manifest = extract_extra(&document);
        Ok(self)
    }
}

fn extract_extra(document: &Value) -> Option<Value> {
    document
        .pointer("/expo/extra")
        .or_else(|| document.get("extra"))
        .filter(|extra| extra.is_object())
        .cloned()
}

impl ConfigSource for AppManifestSource {
    fn app_config_extra(&self) -> Option<Value> {
        self.app_config.clone()
    }

    fn manifest_extra(&self) -> Option<Value> {
        self.manifest.clone()
    }
}
