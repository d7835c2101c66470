//! Process-wide session client handle.
//!
//! The backend models one authenticated session per process, so the client is
//! constructed lazily on first access and shared for the rest of the process
//! lifetime. There is no teardown.

use crate::error::Result;
use crate::session::{FirebaseAuth, SessionClient};
use bridge_traits::http::HttpClient;
use core_runtime::config::AppConfig;
use core_runtime::events::EventBus;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

/// Memoizing holder for a shared session client.
pub struct SessionClientCell<T: ?Sized> {
    inner: OnceCell<Arc<T>>,
}

impl<T: ?Sized> SessionClientCell<T> {
    pub const fn new() -> Self {
        Self {
            inner: OnceCell::new(),
        }
    }

    /// Return the shared client, constructing it with `init` on first use.
    ///
    /// If `init` fails the cell stays empty and a later call may retry.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<Arc<T>>,
    {
        self.inner.get_or_try_init(init).map(Arc::clone)
    }

    /// The shared client, if it has been constructed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.get().cloned()
    }
}

impl<T: ?Sized> Default for SessionClientCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_AUTH: SessionClientCell<FirebaseAuth> = SessionClientCell::new();

/// The process-wide Firebase session client.
///
/// The first call builds it from `config`; later calls ignore their arguments
/// and return the same instance.
pub fn auth_or_init(
    config: &AppConfig,
    http_client: Arc<dyn HttpClient>,
    event_bus: Option<EventBus>,
) -> Result<Arc<FirebaseAuth>> {
    DEFAULT_AUTH.get_or_try_init(|| {
        let mut client = FirebaseAuth::new(&config.firebase, http_client)?;
        if let Some(bus) = event_bus {
            client = client.with_event_bus(bus);
        }
        info!(
            project_id = config.firebase.project_id.as_deref().unwrap_or("unknown"),
            "Session client initialized"
        );
        Ok(Arc::new(client))
    })
}

/// The process-wide session client, if [`auth_or_init`] has run.
pub fn auth() -> Option<Arc<dyn SessionClient>> {
    DEFAULT_AUTH
        .get()
        .map(|client| client as Arc<dyn SessionClient>)
}
