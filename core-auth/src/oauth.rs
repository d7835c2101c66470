//! Google OAuth Request Helper
//!
//! Implements the provider side of the sign-in flow: it prepares an implicit
//! OpenID Connect authorization request that returns an identity token,
//! drives the interactive prompt through the host's [`AuthSessionBrowser`],
//! and turns the redirect into a typed [`PromptResult`].
//!
//! # Overview
//!
//! - Requests are prepared asynchronously and are not usable until then
//!   ([`AuthPrompt::is_ready`])
//! - A random `state` guards the redirect against CSRF; a random `nonce` is
//!   bound into the identity token
//! - Tokens never appear in logs
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{AuthPrompt, GoogleAuthRequest, GoogleAuthRequestConfig, PromptOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::browser::AuthSessionBrowser;
//! # let browser: Arc<dyn AuthSessionBrowser> = todo!();
//! let config = GoogleAuthRequestConfig::new(
//!     Some("1234.apps.googleusercontent.com".to_string()),
//!     "com.example.app:/oauthredirect",
//! );
//!
//! let request = GoogleAuthRequest::new(config, browser);
//! request.prepare().await?;
//! let result = request.prompt(PromptOptions::default()).await?;
//! println!("prompt ended with {}", result.kind());
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::browser::{AuthSessionBrowser, AuthSessionOptions, BrowserResult};
use once_cell::sync::OnceCell;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// Google's authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scopes requested for sign-in.
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// How an interactive prompt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    /// The provider redirected back; `params` holds the redirect parameters.
    Success { params: HashMap<String, String> },
    /// The user closed the prompt on purpose.
    Dismissed,
    /// The host cancelled the prompt.
    Cancelled,
    /// Another prompt is holding the browser.
    Locked,
    /// The provider reported an error, or the redirect failed validation.
    Error {
        code: String,
        description: Option<String>,
    },
}

impl PromptResult {
    /// Short machine-readable name of the result type.
    pub fn kind(&self) -> &'static str {
        match self {
            PromptResult::Success { .. } => "success",
            PromptResult::Dismissed => "dismissed",
            PromptResult::Cancelled => "cancelled",
            PromptResult::Locked => "locked",
            PromptResult::Error { .. } => "error",
        }
    }

    /// The identity token, if this is a success carrying one.
    pub fn id_token(&self) -> Option<&str> {
        match self {
            PromptResult::Success { params } => params
                .get("id_token")
                .map(String::as_str)
                .filter(|token| !token.is_empty()),
            _ => None,
        }
    }
}

impl From<BrowserResult> for PromptResult {
    fn from(result: BrowserResult) -> Self {
        match result {
            // Success needs the redirect parsed against the request state.
            BrowserResult::Success { .. } => PromptResult::Error {
                code: "unparsed_redirect".to_string(),
                description: None,
            },
            BrowserResult::Dismiss => PromptResult::Dismissed,
            BrowserResult::Cancel => PromptResult::Cancelled,
            BrowserResult::Locked => PromptResult::Locked,
        }
    }
}

/// Per-attempt prompt options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptOptions {
    /// Route the redirect through the sandbox auth proxy.
    pub use_proxy: bool,
    /// Keep the browser visible in the OS task switcher.
    pub show_in_recents: bool,
}

/// The OAuth provider contract the sign-in screen depends on.
#[async_trait]
pub trait AuthPrompt: Send + Sync {
    /// Whether the request has been prepared and a prompt may be opened.
    fn is_ready(&self) -> bool;

    /// Open the interactive prompt and wait for it to finish.
    async fn prompt(&self, options: PromptOptions) -> Result<PromptResult>;
}

/// Static description of a Google sign-in request.
#[derive(Debug, Clone)]
pub struct GoogleAuthRequestConfig {
    /// OAuth client id for the running platform, if one is configured
    pub client_id: Option<String>,
    /// Redirect URI registered for the app's own scheme
    pub redirect_uri: String,
    /// Redirect URI of the sandbox auth proxy, used when prompting with `use_proxy`
    pub proxy_redirect_uri: Option<String>,
    pub scopes: Vec<String>,
    pub auth_url: String,
    /// Always show Google's account chooser
    pub select_account: bool,
}

impl GoogleAuthRequestConfig {
    pub fn new(client_id: Option<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id,
            redirect_uri: redirect_uri.into(),
            proxy_redirect_uri: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            select_account: true,
        }
    }

    pub fn with_proxy_redirect(mut self, uri: Option<String>) -> Self {
        self.proxy_redirect_uri = uri;
        self
    }
}

/// Random values bound to one prepared request.
#[derive(Clone)]
struct RequestSecrets {
    state: String,
    nonce: String,
}

impl RequestSecrets {
    fn generate() -> Self {
        let mut rng = rand::thread_rng();

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);

        let mut nonce_bytes = [0u8; 32];
        rng.fill(&mut nonce_bytes);

        Self {
            state: URL_SAFE_NO_PAD.encode(state_bytes),
            nonce: URL_SAFE_NO_PAD.encode(nonce_bytes),
        }
    }
}

impl std::fmt::Debug for RequestSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSecrets")
            .field("state", &self.state)
            .field("nonce", &"[REDACTED]")
            .finish()
    }
}

/// Google sign-in request bound to the host browser.
pub struct GoogleAuthRequest {
    config: GoogleAuthRequestConfig,
    browser: Arc<dyn AuthSessionBrowser>,
    prepared: OnceCell<RequestSecrets>,
}

impl GoogleAuthRequest {
    pub fn new(config: GoogleAuthRequestConfig, browser: Arc<dyn AuthSessionBrowser>) -> Self {
        Self {
            config,
            browser,
            prepared: OnceCell::new(),
        }
    }

    /// Prepare the request. Idempotent; the first preparation wins.
    ///
    /// A request without a client id still becomes ready so that callers can
    /// apply their own preconditions; prompting it fails with
    /// [`AuthError::MissingClientId`].
    #[instrument(skip(self))]
    pub async fn prepare(&self) -> Result<()> {
        Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::PromptFailed(format!("Invalid auth URL: {}", e)))?;

        self.prepared.get_or_init(RequestSecrets::generate);

        if self.config.client_id.is_none() {
            warn!("Google auth request prepared without a client id");
        } else {
            debug!("Google auth request prepared");
        }
        Ok(())
    }

    /// Redirect URI for the given proxy setting.
    pub fn redirect_uri(&self, use_proxy: bool) -> &str {
        match (use_proxy, self.config.proxy_redirect_uri.as_deref()) {
            (true, Some(proxy)) => proxy,
            _ => &self.config.redirect_uri,
        }
    }

    /// Build the authorization URL for a prepared request.
    pub fn build_auth_url(&self, use_proxy: bool) -> Result<String> {
        let secrets = self
            .prepared
            .get()
            .ok_or_else(|| AuthError::PromptFailed("Auth request is not prepared".to_string()))?;
        let client_id = self.config.client_id.as_deref().ok_or_else(|| {
            AuthError::MissingClientId {
                platform: "current platform".to_string(),
            }
        })?;

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::PromptFailed(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", client_id);
            query.append_pair("redirect_uri", self.redirect_uri(use_proxy));
            query.append_pair("response_type", "id_token");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", &secrets.state);
            query.append_pair("nonce", &secrets.nonce);
            if self.config.select_account {
                query.append_pair("prompt", "select_account");
            }
        }

        Ok(url.to_string())
    }

    fn expected_state(&self) -> Option<&str> {
        self.prepared.get().map(|secrets| secrets.state.as_str())
    }
}

#[async_trait]
impl AuthPrompt for GoogleAuthRequest {
    fn is_ready(&self) -> bool {
        self.prepared.get().is_some()
    }

    #[instrument(skip(self))]
    async fn prompt(&self, options: PromptOptions) -> Result<PromptResult> {
        let auth_url = self.build_auth_url(options.use_proxy)?;
        let expected_state = self.expected_state().unwrap_or_default().to_string();

        // Through the proxy the browser returns to the app, not to the proxy.
        let return_url = self.config.redirect_uri.clone();

        let session_options = AuthSessionOptions {
            show_in_recents: options.show_in_recents,
            prefer_ephemeral_session: false,
        };

        let outcome = self
            .browser
            .open_auth_session(&auth_url, &return_url, session_options)
            .await?;

        let result = match outcome {
            BrowserResult::Success { url } => parse_redirect(&url, &expected_state)?,
            other => PromptResult::from(other),
        };

        debug!(result = result.kind(), "Auth prompt finished");
        Ok(result)
    }
}

/// Parse an OAuth redirect into a prompt result.
///
/// Parameters are read from both the query and the fragment; implicit-flow
/// responses carry them in the fragment.
pub fn parse_redirect(redirect: &str, expected_state: &str) -> Result<PromptResult> {
    let url = Url::parse(redirect)
        .map_err(|e| AuthError::PromptFailed(format!("Invalid redirect URL: {}", e)))?;

    let mut params: HashMap<String, String> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(fragment) = url.fragment() {
        params.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    if let Some(code) = params.get("error") {
        return Ok(PromptResult::Error {
            code: code.clone(),
            description: params.get("error_description").cloned(),
        });
    }

    if params.get("state").map(String::as_str) != Some(expected_state) {
        warn!("OAuth redirect state mismatch");
        return Ok(PromptResult::Error {
            code: "state_mismatch".to_string(),
            description: Some("Redirect state does not match the request".to_string()),
        });
    }

    Ok(PromptResult::Success { params })
}
