//! Alert presenter for terminal and headless desktop shells.

use bridge_traits::alert::{Alert, AlertPresenter};
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

/// Writes alerts to a text sink (stderr by default) and to the log.
pub struct ConsoleAlertPresenter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleAlertPresenter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for ConsoleAlertPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertPresenter for ConsoleAlertPresenter {
    fn show_alert(&self, alert: Alert) {
        info!(title = %alert.title, "Presenting alert");

        let Ok(mut out) = self.out.lock() else {
            return;
        };
        let written = match &alert.message {
            Some(message) => writeln!(out, "[{}] {}", alert.title, message),
            None => writeln!(out, "[{}]", alert.title),
        };
        // Presentation is best effort.
        written.and_then(|_| out.flush()).ok();
    }
}
