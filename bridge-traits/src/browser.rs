//! Interactive Auth Session Browser
//!
//! The OAuth prompt is an interactive browser session owned by the host: an
//! in-app browser tab on mobile, the system browser on desktop, a popup on
//! the web. The core hands over an authorization URL and waits for the host
//! to report how the session ended.

use crate::{error::Result, platform::PlatformSendSync};

/// Outcome of an interactive browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserResult {
    /// The provider redirected back to the return URL.
    Success {
        /// The full redirect URL, including query and fragment.
        url: String,
    },
    /// The user closed the browser.
    Dismiss,
    /// The host cancelled the session (e.g. a second prompt replaced it).
    Cancel,
    /// Another auth session is already holding the browser.
    Locked,
}

/// Host-level options for an auth session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthSessionOptions {
    /// Keep the browser visible in the OS task switcher (Android).
    pub show_in_recents: bool,
    /// Ask the OS not to share cookies with the default browser (iOS).
    pub prefer_ephemeral_session: bool,
}

/// Launches interactive authentication sessions.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::browser::{AuthSessionBrowser, AuthSessionOptions, BrowserResult};
///
/// async fn run(browser: &dyn AuthSessionBrowser, url: &str) {
///     match browser
///         .open_auth_session(url, "com.example.app:/oauth", AuthSessionOptions::default())
///         .await
///     {
///         Ok(BrowserResult::Success { url }) => println!("redirected to {url}"),
///         Ok(other) => println!("session ended: {other:?}"),
///         Err(err) => eprintln!("browser failed: {err}"),
///     }
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AuthSessionBrowser: PlatformSendSync {
    /// Open `auth_url` and resolve once the browser navigates to `return_url`
    /// or the session ends some other way.
    async fn open_auth_session(
        &self,
        auth_url: &str,
        return_url: &str,
        options: AuthSessionOptions,
    ) -> Result<BrowserResult>;

    /// Finish a session that redirected into a freshly loaded page (web popup
    /// flow). Returns `true` when a pending session was completed.
    fn maybe_complete_auth_session(&self) -> bool {
        false
    }
}
