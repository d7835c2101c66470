//! User-facing alert surface.

use crate::platform::PlatformSendSync;

/// A blocking informational alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: Option<String>,
}

impl Alert {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Presents alerts on the host's UI surface.
///
/// Presentation is fire-and-forget: the core never waits for the user to
/// acknowledge an alert.
pub trait AlertPresenter: PlatformSendSync {
    fn show_alert(&self, alert: Alert);
}
