//! Render model of the sign-in screen.
//!
//! Hosts draw one of three renderings. The model carries everything they need
//! to decide enablement and texts, so no host re-implements the screen rules.

use crate::controller::PlatformCapabilities;
use crate::messages;
use crate::types::{ScreenPhase, ScreenState};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum ScreenView {
    /// Waiting for the first session notification.
    Loading,
    /// Card with the signed-in user and a sign-out button.
    SignedIn {
        avatar_url: Option<String>,
        display_name: String,
        email: Option<String>,
        sign_out_enabled: bool,
    },
    /// Card with the sign-in button.
    SignedOut {
        sign_in_enabled: bool,
        /// Replace the button label with a spinner.
        show_spinner: bool,
        /// Platform limitation notice under the button.
        warning: Option<String>,
    },
}

impl ScreenView {
    pub fn from_state(
        state: &ScreenState,
        capabilities: &PlatformCapabilities,
        prompt_ready: bool,
    ) -> Self {
        match (state.phase(), &state.current_user) {
            (ScreenPhase::Initializing, _) => ScreenView::Loading,
            (ScreenPhase::SignedIn, Some(user)) => ScreenView::SignedIn {
                avatar_url: user.photo_url.clone().filter(|url| !url.is_empty()),
                display_name: user
                    .display_name
                    .clone()
                    .unwrap_or_else(|| messages::NO_DISPLAY_NAME.to_string()),
                email: user.email.clone(),
                sign_out_enabled: true,
            },
            (phase, _) => {
                let authenticating = phase == ScreenPhase::Authenticating;
                let sandbox_missing = capabilities.sandbox_client_missing();
                ScreenView::SignedOut {
                    sign_in_enabled: prompt_ready && !authenticating && !sandbox_missing,
                    show_spinner: authenticating,
                    warning: sandbox_missing.then(|| messages::SANDBOX_WARNING.to_string()),
                }
            }
        }
    }

    /// Screen heading, shown in every rendering.
    pub fn title(&self) -> &'static str {
        messages::SCREEN_TITLE
    }

    /// Text of the card's button; `None` while loading or while the spinner
    /// replaces it.
    pub fn button_label(&self) -> Option<&'static str> {
        match self {
            ScreenView::Loading => None,
            ScreenView::SignedIn { .. } => Some(messages::SIGN_OUT_LABEL),
            ScreenView::SignedOut {
                show_spinner: true, ..
            } => None,
            ScreenView::SignedOut { .. } => Some(messages::SIGN_IN_LABEL),
        }
    }
}
