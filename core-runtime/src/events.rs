//! # Event Bus System
//!
//! Broadcasts typed notifications about the sign-in flow over
//! `tokio::sync::broadcast` so hosts and diagnostics can observe the core
//! without being wired into it.
//!
//! The bus is informational. The authoritative signed-in user always comes
//! from the session backend's state stream, never from this bus.
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(16);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SigningIn {
//!         provider: "google.com".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(receiver.try_recv().is_ok());
//! ```
//!
//! Slow subscribers observe `RecvError::Lagged` and may keep reading.
//! Emitting with no subscribers returns an error that emitters ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session and sign-in flow events
    Auth(AuthEvent),
    /// User-visible surface events
    Ui(UiEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Ui(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignInCancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. } | AuthEvent::SignedOut { .. }) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to the sign-in flow and the backend session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// The interactive OAuth prompt was opened.
    SigningIn {
        /// Identity provider id (e.g. "google.com").
        provider: String,
    },
    /// The backend confirmed a signed-in user.
    SignedIn {
        /// Backend user id.
        uid: String,
        /// Identity provider id.
        provider: String,
    },
    /// The backend session ended.
    SignedOut {
        /// The user that was signed out, when known.
        uid: Option<String>,
    },
    /// The prompt ended without producing an identity token.
    SignInCancelled {
        provider: String,
        /// Prompt result kind (e.g. "cancelled", "locked", "missing_id_token").
        reason: String,
    },
    /// An operation against the provider or backend failed.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether the user can retry.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn { .. } => "Authentication in progress",
            AuthEvent::SignedIn { .. } => "User signed in successfully",
            AuthEvent::SignedOut { .. } => "User signed out",
            AuthEvent::SignInCancelled { .. } => "Sign-in cancelled",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// UI Events
// ============================================================================

/// Events describing what the sign-in screen showed to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UiEvent {
    /// The screen controller subscribed to session changes.
    ScreenMounted,
    /// The screen controller released its subscription.
    ScreenUnmounted,
    /// An alert was presented.
    AlertShown {
        title: String,
    },
}

impl UiEvent {
    fn description(&self) -> &str {
        match self {
            UiEvent::ScreenMounted => "Sign-in screen mounted",
            UiEvent::ScreenUnmounted => "Sign-in screen unmounted",
            UiEvent::AlertShown { .. } => "Alert shown",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable handle to the broadcast channel. Each [`subscribe`](Self::subscribe)
/// call sees only events emitted after it.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` bounds how far a subscriber may fall behind before it lags.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber, returning how many received it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
