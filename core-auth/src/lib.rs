//! # Sign-In Module
//!
//! Google sign-in on top of Firebase Authentication.
//!
//! ## Overview
//!
//! This crate holds everything between the host bridges and the rendered
//! screen: the backend session client, the Google OAuth request helper and the
//! controller that drives the sign-in screen.
//!
//! ## Features
//!
//! - Firebase session client over the Identity Toolkit REST API
//! - Process-wide session client handle with memoized construction
//! - Google OpenID Connect prompt returning an identity token
//! - Screen controller mirroring the backend's session-state stream
//! - Render model for hosts
//! - Auth state event emission

pub mod app;
pub mod controller;
pub mod error;
pub mod messages;
pub mod oauth;
pub mod session;
pub mod types;
pub mod view;

pub use app::{auth, auth_or_init, SessionClientCell};
pub use controller::{PlatformCapabilities, SignInController, SignInOutcome, SignOutOutcome};
pub use error::{AuthError, Result};
pub use oauth::{
    AuthPrompt, GoogleAuthRequest, GoogleAuthRequestConfig, PromptOptions, PromptResult,
};
pub use session::{AuthStateNotification, AuthStateSubscription, FirebaseAuth, SessionClient};
pub use types::{CurrentUser, GoogleCredential, ScreenPhase, ScreenState, SessionTokens};
pub use view::ScreenView;
