use bridge_traits::time::Clock;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider id of Google as the backend knows it.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// The user the backend currently reports as signed in.
///
/// Values of this type only ever originate from the session backend. The
/// screen controller mirrors them and never fabricates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user id
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    /// Avatar location as reported by the identity provider
    pub photo_url: Option<String>,
    /// Identity provider that established the session
    pub provider_id: String,
}

/// Session credential built from a provider-issued identity token.
///
/// # Security
///
/// The `Debug` implementation never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct GoogleCredential {
    id_token: String,
}

impl GoogleCredential {
    pub(crate) fn new(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
        }
    }

    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    pub fn provider_id(&self) -> &'static str {
        GOOGLE_PROVIDER_ID
    }
}

impl fmt::Debug for GoogleCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCredential")
            .field("provider_id", &GOOGLE_PROVIDER_ID)
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

/// Backend session tokens held in memory for the lifetime of a sign-in.
#[derive(Clone)]
pub struct SessionTokens {
    /// Backend-issued id token
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// When the id token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl SessionTokens {
    /// Create a token set expiring `expires_in` seconds after `clock.now()`.
    pub fn new(
        id_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            id_token,
            refresh_token,
            expires_at: clock.now() + Duration::seconds(expires_in),
        }
    }

    /// Whether the id token is expired at the clock's current time.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        clock.now() >= self.expires_at
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("id_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Coarse phase of the sign-in screen.
///
/// # State Transitions
///
/// ```text
/// Initializing -> SignedOut <-> Authenticating
///      |             ^  |            |
///      v             |  v            |
///   SignedIn <-------+--+------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenPhase {
    /// Waiting for the first session notification
    Initializing,
    SignedOut,
    /// An interactive sign-in attempt is in flight
    Authenticating,
    SignedIn,
}

impl fmt::Display for ScreenPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenPhase::Initializing => write!(f, "Initializing..."),
            ScreenPhase::SignedOut => write!(f, "Signed Out"),
            ScreenPhase::Authenticating => write!(f, "Signing In..."),
            ScreenPhase::SignedIn => write!(f, "Signed In"),
        }
    }
}

/// State owned by the sign-in screen controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenState {
    /// True until the first session notification arrives
    pub initializing: bool,
    /// True while an interactive sign-in attempt is in flight
    pub authenticating: bool,
    /// Mirror of the backend's last reported user
    pub current_user: Option<CurrentUser>,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            initializing: true,
            authenticating: false,
            current_user: None,
        }
    }
}

impl ScreenState {
    pub fn phase(&self) -> ScreenPhase {
        if self.initializing {
            ScreenPhase::Initializing
        } else if self.current_user.is_some() {
            ScreenPhase::SignedIn
        } else if self.authenticating {
            ScreenPhase::Authenticating
        } else {
            ScreenPhase::SignedOut
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user.is_some()
    }
}
