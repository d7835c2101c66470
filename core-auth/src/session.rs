//! # Backend Session Client
//!
//! The contract of the authentication backend ([`SessionClient`]) and its
//! Firebase implementation over the Identity Toolkit REST API
//! ([`FirebaseAuth`]).
//!
//! ## Session state stream
//!
//! The backend pushes identity changes through a `tokio::sync::watch`
//! channel. Every [`AuthStateSubscription`] first yields the value current at
//! subscription time and then each later change, so a freshly mounted screen
//! always learns the authoritative state without polling.
//!
//! ```no_run
//! use core_auth::session::{FirebaseAuth, SessionClient};
//! use core_runtime::config::FirebaseOptions;
//! use std::sync::Arc;
//! # use bridge_traits::http::HttpClient;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! # let options: FirebaseOptions = todo!();
//! let auth = FirebaseAuth::new(&options, http_client)?;
//!
//! let mut subscription = auth.on_auth_state_changed();
//! while let Some(notification) = subscription.next().await {
//!     println!("signed in: {}", notification.user.is_some());
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{CurrentUser, GoogleCredential, SessionTokens, GOOGLE_PROVIDER_ID};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::config::FirebaseOptions;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, instrument, warn};

/// Base URL of the Identity Toolkit v1 API.
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// `requestUri` sent with IdP sign-ins that carry an id token directly.
pub const DEFAULT_REQUEST_URI: &str = "http://localhost";

/// Default timeout for a single backend request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One session-state notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateNotification {
    /// The user the backend reports, `None` when signed out.
    pub user: Option<CurrentUser>,
}

/// Subscription to backend session-state changes.
///
/// Dropping the subscription releases it.
pub struct AuthStateSubscription {
    receiver: watch::Receiver<Option<CurrentUser>>,
    delivered_initial: bool,
}

impl AuthStateSubscription {
    pub fn new(receiver: watch::Receiver<Option<CurrentUser>>) -> Self {
        Self {
            receiver,
            delivered_initial: false,
        }
    }

    /// Wait for the next notification.
    ///
    /// The first call resolves immediately with the current value. Returns
    /// `None` once the backend has gone away.
    pub async fn next(&mut self) -> Option<AuthStateNotification> {
        if self.delivered_initial {
            self.receiver.changed().await.ok()?;
        }
        self.delivered_initial = true;

        let user = self.receiver.borrow_and_update().clone();
        Some(AuthStateNotification { user })
    }
}

/// The authentication backend as the sign-in screen sees it.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Build a backend credential from a Google identity token.
    fn credential_from_id_token(&self, id_token: &str) -> Result<GoogleCredential>;

    /// Establish a backend session. On success the new user is also published
    /// to every state subscription.
    async fn sign_in_with_credential(&self, credential: GoogleCredential) -> Result<CurrentUser>;

    /// End the backend session. Subscribers observe `None` afterwards.
    async fn sign_out(&self) -> Result<()>;

    /// The user the backend currently reports.
    fn current_user(&self) -> Option<CurrentUser>;

    /// Subscribe to session-state changes.
    fn on_auth_state_changed(&self) -> AuthStateSubscription;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest {
    post_body: String,
    request_uri: String,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    provider_id: Option<String>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firebase Authentication over the Identity Toolkit REST API.
///
/// Sessions live in memory only; refresh and persistence are left to the
/// host.
pub struct FirebaseAuth {
    api_key: String,
    endpoint: String,
    request_uri: String,
    request_timeout: Duration,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    state: watch::Sender<Option<CurrentUser>>,
    tokens: Mutex<Option<SessionTokens>>,
}

impl FirebaseAuth {
    /// Create a client for the given project.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the options carry no usable API key.
    pub fn new(options: &FirebaseOptions, http_client: Arc<dyn HttpClient>) -> Result<Self> {
        options.validate()?;

        let (state, _) = watch::channel(None);
        Ok(Self {
            api_key: options.api_key().to_string(),
            endpoint: IDENTITY_TOOLKIT_URL.to_string(),
            request_uri: DEFAULT_REQUEST_URI.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            http_client,
            clock: Arc::new(SystemClock),
            event_bus: None,
            state,
            tokens: Mutex::new(None),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_uri(mut self, request_uri: impl Into<String>) -> Self {
        self.request_uri = request_uri.into();
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// The backend id token of the current session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] when no session exists
    /// - [`AuthError::SessionExpired`] when the token has expired
    pub async fn id_token(&self) -> Result<String> {
        let tokens = self.tokens.lock().await;
        match tokens.as_ref() {
            None => Err(AuthError::NotAuthenticated),
            Some(tokens) if tokens.is_expired(self.clock.as_ref()) => {
                Err(AuthError::SessionExpired)
            }
            Some(tokens) => Ok(tokens.id_token.clone()),
        }
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Auth(event)).ok();
        }
    }

    async fn post<B: Serialize>(&self, operation: &str, body: &B) -> Result<HttpResponse> {
        let url = format!("{}/{}?key={}", self.endpoint, operation, self.api_key);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .header("Accept", "application/json")
            .timeout(self.request_timeout)
            .json(body)?;

        let response = timeout(self.request_timeout, self.http_client.execute(request))
            .await
            .map_err(|_| AuthError::OperationTimeout {
                operation: operation.to_string(),
            })??;

        if !response.is_success() {
            return Err(backend_error(&response));
        }
        Ok(response)
    }
}

/// Map a non-2xx Identity Toolkit response to [`AuthError::Backend`].
///
/// Messages look like `"INVALID_IDP_RESPONSE : detail"`; the part before the
/// separator becomes the error code.
fn backend_error(response: &HttpResponse) -> AuthError {
    match response.json::<ErrorEnvelope>() {
        Ok(envelope) => {
            let message = envelope.error.message;
            let code = message
                .split(" : ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            AuthError::Backend { code, message }
        }
        Err(_) => AuthError::Backend {
            code: format!("HTTP_{}", response.status),
            message: response.text().unwrap_or_default(),
        },
    }
}

#[async_trait]
impl SessionClient for FirebaseAuth {
    fn credential_from_id_token(&self, id_token: &str) -> Result<GoogleCredential> {
        if id_token.trim().is_empty() {
            return Err(AuthError::InvalidCredential(
                "Identity token is empty".to_string(),
            ));
        }
        Ok(GoogleCredential::new(id_token))
    }

    #[instrument(skip(self, credential), fields(provider = credential.provider_id()))]
    async fn sign_in_with_credential(&self, credential: GoogleCredential) -> Result<CurrentUser> {
        let post_body = serde_urlencoded::to_string([
            ("id_token", credential.id_token()),
            ("providerId", credential.provider_id()),
        ])
        .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;

        let body = SignInWithIdpRequest {
            post_body,
            request_uri: self.request_uri.clone(),
            return_idp_credential: true,
            return_secure_token: true,
        };

        debug!(
            id_token = %redact_if_sensitive("id_token", credential.id_token()),
            request_uri = %body.request_uri,
            "Submitting Google credential"
        );
        let response = self.post("accounts:signInWithIdp", &body).await?;
        let payload: SignInWithIdpResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        // Linking conflicts come back as 200 with an error message.
        if let Some(message) = payload.error_message {
            warn!(code = %message, "signInWithIdp reported an error");
            return Err(AuthError::Backend {
                code: message.clone(),
                message,
            });
        }

        let id_token = payload
            .id_token
            .ok_or_else(|| AuthError::InvalidResponse("Missing idToken".to_string()))?;
        let expires_in = payload
            .expires_in
            .as_deref()
            .unwrap_or("3600")
            .parse::<i64>()
            .map_err(|e| AuthError::InvalidResponse(format!("Invalid expiresIn: {}", e)))?;

        let user = CurrentUser {
            uid: payload.local_id,
            display_name: payload.display_name,
            email: payload.email,
            photo_url: payload.photo_url,
            provider_id: payload
                .provider_id
                .unwrap_or_else(|| GOOGLE_PROVIDER_ID.to_string()),
        };

        *self.tokens.lock().await = Some(SessionTokens::new(
            id_token,
            payload.refresh_token,
            expires_in,
            self.clock.as_ref(),
        ));
        self.state.send_replace(Some(user.clone()));

        info!(
            uid = %user.uid,
            email = %redact_if_sensitive("email", user.email.as_deref().unwrap_or_default()),
            "Signed in with Google credential"
        );
        self.emit(AuthEvent::SignedIn {
            uid: user.uid.clone(),
            provider: user.provider_id.clone(),
        });

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        self.tokens.lock().await.take();
        let previous = self.state.send_replace(None);

        match &previous {
            Some(user) => info!(uid = %user.uid, "Signed out"),
            None => debug!("Sign-out requested without an active session"),
        }
        self.emit(AuthEvent::SignedOut {
            uid: previous.map(|user| user.uid),
        });

        Ok(())
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.state.borrow().clone()
    }

    fn on_auth_state_changed(&self) -> AuthStateSubscription {
        AuthStateSubscription::new(self.state.subscribe())
    }
}
