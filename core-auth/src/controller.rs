//! # Sign-In Screen Controller
//!
//! Orchestrates the Google prompt, the credential exchange and the backend
//! session subscription, and owns the [`ScreenState`] the host renders.
//!
//! ## Source of truth
//!
//! `current_user` is only ever written by the session-state listener. Sign-in
//! and sign-out submit requests to the backend and wait for it to report the
//! result through the subscription; neither assigns a user locally.
//!
//! ## Lifecycle
//!
//! [`SignInController::mount`] subscribes to the backend and spawns the
//! listener task, so it must run inside a Tokio runtime. The listener is
//! cancelled by [`SignInController::unmount`] or when the controller is
//! dropped. An interactive prompt that is still open at that point is not
//! cancelled.

use crate::error::{AuthError, Result};
use crate::messages;
use crate::oauth::{AuthPrompt, PromptOptions, PromptResult};
use crate::session::{AuthStateNotification, SessionClient};
use crate::types::{ScreenState, GOOGLE_PROVIDER_ID};
use crate::view::ScreenView;
use bridge_traits::alert::{Alert, AlertPresenter};
use bridge_traits::environment::{AppOwnership, HostEnvironment, Platform};
use core_runtime::config::GoogleAuthConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, UiEvent};
use core_runtime::logging::redact_if_sensitive;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Platform facts the controller branches on, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub platform: Platform,
    pub app_ownership: AppOwnership,
    /// Whether an OAuth client id for the sandbox client is configured
    pub sandbox_client_configured: bool,
}

impl PlatformCapabilities {
    pub fn resolve(environment: &dyn HostEnvironment, google: &GoogleAuthConfig) -> Self {
        Self {
            platform: environment.platform(),
            app_ownership: environment.app_ownership(),
            sandbox_client_configured: google.has_sandbox_client(),
        }
    }

    pub fn is_sandbox(&self) -> bool {
        self.app_ownership == AppOwnership::Sandbox
    }

    /// True when running in the sandbox client without a client id for it.
    pub fn sandbox_client_missing(&self) -> bool {
        self.is_sandbox() && !self.sandbox_client_configured
    }

    /// Prompt options for this platform. The sandbox client goes through the
    /// auth proxy.
    pub fn prompt_options(&self) -> PromptOptions {
        PromptOptions {
            use_proxy: self.is_sandbox(),
            show_in_recents: true,
        }
    }
}

/// What a sign-in action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The prompt was not prepared yet; nothing happened beyond a notice.
    NotReady,
    /// Sign-in is unavailable in this sandbox client; a notice was shown.
    SandboxClientMissing,
    /// Another attempt is still in flight.
    AlreadyInProgress,
    /// The credential was accepted by the backend. The user arrives through
    /// the session subscription.
    Submitted,
    /// The user closed the prompt.
    Dismissed,
    /// The prompt ended without an identity token.
    Cancelled { reason: String },
    /// The prompt, the exchange or the backend failed.
    Failed,
}

/// What a sign-out action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutOutcome {
    Requested,
    Failed,
}

/// Holds `authenticating` for one attempt and clears it when dropped.
struct AuthenticatingGuard<'a> {
    state: &'a watch::Sender<ScreenState>,
}

impl<'a> AuthenticatingGuard<'a> {
    /// Set `authenticating`, or return `None` if it was already set.
    fn engage(state: &'a watch::Sender<ScreenState>) -> Option<Self> {
        let engaged = state.send_if_modified(|screen| {
            if screen.authenticating {
                false
            } else {
                screen.authenticating = true;
                true
            }
        });
        engaged.then_some(Self { state })
    }
}

impl Drop for AuthenticatingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|screen| screen.authenticating = false);
    }
}

/// Controller of the sign-in screen.
///
/// # Example
///
/// ```no_run
/// use core_auth::controller::{PlatformCapabilities, SignInController};
/// # use std::sync::Arc;
/// # use core_auth::{oauth::AuthPrompt, session::SessionClient};
/// # use bridge_traits::alert::AlertPresenter;
/// # async fn example(
/// #     session: Arc<dyn SessionClient>,
/// #     prompt: Arc<dyn AuthPrompt>,
/// #     alerts: Arc<dyn AlertPresenter>,
/// #     capabilities: PlatformCapabilities,
/// # ) {
/// let controller = SignInController::mount(session, prompt, alerts, capabilities, None);
///
/// let mut screen = controller.watch();
/// screen.wait_for(|state| !state.initializing).await.ok();
///
/// controller.sign_in().await;
/// controller.unmount().await;
/// # }
/// ```
pub struct SignInController {
    session: Arc<dyn SessionClient>,
    prompt: Arc<dyn AuthPrompt>,
    alerts: Arc<dyn AlertPresenter>,
    capabilities: PlatformCapabilities,
    event_bus: Option<EventBus>,
    state: Arc<watch::Sender<ScreenState>>,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SignInController {
    /// Subscribe to the backend session and start mirroring it.
    pub fn mount(
        session: Arc<dyn SessionClient>,
        prompt: Arc<dyn AuthPrompt>,
        alerts: Arc<dyn AlertPresenter>,
        capabilities: PlatformCapabilities,
        event_bus: Option<EventBus>,
    ) -> Self {
        let (state, _) = watch::channel(ScreenState::default());
        let state = Arc::new(state);
        let cancel = CancellationToken::new();

        let mut subscription = session.on_auth_state_changed();
        let listener_state = Arc::clone(&state);
        let token = cancel.clone();

        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    notification = subscription.next() => match notification {
                        Some(AuthStateNotification { user }) => {
                            debug!(signed_in = user.is_some(), "Session state changed");
                            listener_state.send_modify(|screen| {
                                screen.current_user = user;
                                screen.initializing = false;
                            });
                        }
                        None => {
                            warn!("Session state stream closed");
                            break;
                        }
                    },
                }
            }
        });

        info!(
            platform = %capabilities.platform,
            sandbox = capabilities.is_sandbox(),
            "Sign-in screen mounted"
        );
        if let Some(bus) = &event_bus {
            bus.emit(CoreEvent::Ui(UiEvent::ScreenMounted)).ok();
        }

        Self {
            session,
            prompt,
            alerts,
            capabilities,
            event_bus,
            state,
            cancel,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Snapshot of the screen state.
    pub fn state(&self) -> ScreenState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every screen state change.
    pub fn watch(&self) -> watch::Receiver<ScreenState> {
        self.state.subscribe()
    }

    /// Render model for the current state.
    pub fn view(&self) -> ScreenView {
        ScreenView::from_state(
            &self.state.borrow(),
            &self.capabilities,
            self.prompt.is_ready(),
        )
    }

    pub fn capabilities(&self) -> &PlatformCapabilities {
        &self.capabilities
    }

    /// Run one interactive sign-in attempt.
    #[instrument(skip(self))]
    pub async fn sign_in(&self) -> SignInOutcome {
        if !self.prompt.is_ready() {
            debug!("Sign-in requested before the auth request was ready");
            self.alert(
                Alert::new(messages::NOT_READY_TITLE).with_message(messages::NOT_READY_MESSAGE),
            );
            return SignInOutcome::NotReady;
        }

        if self.capabilities.sandbox_client_missing() {
            debug!("Sign-in requested in a sandbox client without a client id");
            self.alert(
                Alert::new(messages::SANDBOX_UNSUPPORTED_TITLE)
                    .with_message(messages::SANDBOX_UNSUPPORTED_MESSAGE),
            );
            return SignInOutcome::SandboxClientMissing;
        }

        let Some(_guard) = AuthenticatingGuard::engage(&self.state) else {
            debug!("Sign-in already in progress");
            return SignInOutcome::AlreadyInProgress;
        };

        self.emit(AuthEvent::SigningIn {
            provider: GOOGLE_PROVIDER_ID.to_string(),
        });

        let result = match self.prompt.prompt(self.capabilities.prompt_options()).await {
            Ok(result) => result,
            Err(err) => return self.sign_in_failed(&err),
        };

        if let Some(id_token) = result.id_token() {
            return match self.submit_id_token(id_token).await {
                Ok(()) => SignInOutcome::Submitted,
                Err(err) => self.sign_in_failed(&err),
            };
        }

        if result == PromptResult::Dismissed {
            debug!("Auth prompt dismissed");
            return SignInOutcome::Dismissed;
        }

        let reason = match &result {
            PromptResult::Success { .. } => "missing_id_token".to_string(),
            PromptResult::Error { code, .. } => format!("error:{}", code),
            other => other.kind().to_string(),
        };
        info!(reason = %reason, "Sign-in cancelled");
        self.emit(AuthEvent::SignInCancelled {
            provider: GOOGLE_PROVIDER_ID.to_string(),
            reason: reason.clone(),
        });
        self.alert(Alert::new(messages::CANCELLED_TITLE));

        SignInOutcome::Cancelled { reason }
    }

    /// Ask the backend to end the session.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> SignOutOutcome {
        match self.session.sign_out().await {
            Ok(()) => SignOutOutcome::Requested,
            Err(err) => {
                error!(error = %err, "Sign-out failed");
                self.emit(AuthEvent::AuthError {
                    message: err.to_string(),
                    recoverable: true,
                });
                self.alert(
                    Alert::new(messages::ERROR_TITLE)
                        .with_message(messages::SIGN_OUT_FAILED_MESSAGE),
                );
                SignOutOutcome::Failed
            }
        }
    }

    /// Stop the session subscription and wait for the listener to finish.
    pub async fn unmount(self) {
        self.cancel.cancel();

        let listener = self.listener.lock().ok().and_then(|mut slot| slot.take());
        if let Some(listener) = listener {
            if let Err(err) = listener.await {
                warn!(error = %err, "Session listener ended abnormally");
            }
        }

        info!("Sign-in screen unmounted");
        self.emit_ui(UiEvent::ScreenUnmounted);
    }

    /// Exchange the identity token and hand the credential to the backend.
    async fn submit_id_token(&self, id_token: &str) -> Result<()> {
        debug!(
            id_token = %redact_if_sensitive("id_token", id_token),
            "Prompt returned an identity token"
        );
        let credential = self.session.credential_from_id_token(id_token)?;
        let user = self.session.sign_in_with_credential(credential).await?;
        debug!(
            uid = %user.uid,
            email = %redact_if_sensitive("email", user.email.as_deref().unwrap_or_default()),
            "Backend accepted the credential"
        );
        Ok(())
    }

    fn sign_in_failed(&self, err: &AuthError) -> SignInOutcome {
        error!(error = %err, "Google sign-in failed");
        self.emit(AuthEvent::AuthError {
            message: err.to_string(),
            recoverable: true,
        });
        self.alert(
            Alert::new(messages::ERROR_TITLE).with_message(messages::SIGN_IN_FAILED_MESSAGE),
        );
        SignInOutcome::Failed
    }

    fn alert(&self, alert: Alert) {
        self.emit_ui(UiEvent::AlertShown {
            title: alert.title.clone(),
        });
        self.alerts.show_alert(alert);
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Auth(event)).ok();
        }
    }

    fn emit_ui(&self, event: UiEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Ui(event)).ok();
        }
    }
}

impl Drop for SignInController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthStateSubscription;
    use crate::types::{CurrentUser, GoogleCredential};
    use async_trait::async_trait;
    use bridge_traits::environment::StaticEnvironment;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn user(uid: &str) -> CurrentUser {
        CurrentUser {
            uid: uid.to_string(),
            display_name: Some("Hanako".to_string()),
            email: Some(format!("{}@example.com", uid)),
            photo_url: None,
            provider_id: GOOGLE_PROVIDER_ID.to_string(),
        }
    }

    /// Backend fake that counts calls and publishes like the real backend.
    struct FakeSession {
        state: watch::Sender<Option<CurrentUser>>,
        credential_calls: AtomicUsize,
        sign_in_calls: AtomicUsize,
        sign_out_calls: AtomicUsize,
        fail_sign_in: AtomicBool,
        fail_sign_out: AtomicBool,
        publish_on_sign_in: AtomicBool,
    }

    impl FakeSession {
        fn new() -> Arc<Self> {
            let (state, _) = watch::channel(None);
            Arc::new(Self {
                state,
                credential_calls: AtomicUsize::new(0),
                sign_in_calls: AtomicUsize::new(0),
                sign_out_calls: AtomicUsize::new(0),
                fail_sign_in: AtomicBool::new(false),
                fail_sign_out: AtomicBool::new(false),
                publish_on_sign_in: AtomicBool::new(true),
            })
        }

        fn publish(&self, user: Option<CurrentUser>) {
            self.state.send_replace(user);
        }
    }

    #[async_trait]
    impl SessionClient for FakeSession {
        fn credential_from_id_token(&self, id_token: &str) -> Result<GoogleCredential> {
            self.credential_calls.fetch_add(1, Ordering::SeqCst);
            Ok(GoogleCredential::new(id_token))
        }

        async fn sign_in_with_credential(
            &self,
            _credential: GoogleCredential,
        ) -> Result<CurrentUser> {
            self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_in.load(Ordering::SeqCst) {
                return Err(AuthError::Backend {
                    code: "INVALID_IDP_RESPONSE".to_string(),
                    message: "INVALID_IDP_RESPONSE".to_string(),
                });
            }
            let signed_in = user("uid-google");
            if self.publish_on_sign_in.load(Ordering::SeqCst) {
                self.publish(Some(signed_in.clone()));
            }
            Ok(signed_in)
        }

        async fn sign_out(&self) -> Result<()> {
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_sign_out.load(Ordering::SeqCst) {
                return Err(AuthError::Transport(
                    bridge_traits::BridgeError::OperationFailed("offline".to_string()),
                ));
            }
            self.publish(None);
            Ok(())
        }

        fn current_user(&self) -> Option<CurrentUser> {
            self.state.borrow().clone()
        }

        fn on_auth_state_changed(&self) -> AuthStateSubscription {
            AuthStateSubscription::new(self.state.subscribe())
        }
    }

    /// Prompt fake with a scripted result and an optional gate.
    struct FakePrompt {
        ready: AtomicBool,
        calls: AtomicUsize,
        script: Mutex<Option<Result<PromptResult>>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakePrompt {
        fn returning(result: Result<PromptResult>) -> Arc<Self> {
            Arc::new(Self {
                ready: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
                script: Mutex::new(Some(result)),
                gate: None,
            })
        }

        fn gated(result: PromptResult, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                ready: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
                script: Mutex::new(Some(Ok(result))),
                gate: Some(gate),
            })
        }

        fn not_ready() -> Arc<Self> {
            let prompt = Self::returning(Ok(PromptResult::Dismissed));
            prompt.ready.store(false, Ordering::SeqCst);
            prompt
        }
    }

    #[async_trait]
    impl AuthPrompt for FakePrompt {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        async fn prompt(&self, _options: PromptOptions) -> Result<PromptResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.script
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(PromptResult::Dismissed))
        }
    }

    #[derive(Default)]
    struct RecordingAlerts {
        shown: Mutex<Vec<Alert>>,
    }

    impl RecordingAlerts {
        fn titles(&self) -> Vec<String> {
            self.shown
                .lock()
                .unwrap()
                .iter()
                .map(|alert| alert.title.clone())
                .collect()
        }
    }

    impl AlertPresenter for RecordingAlerts {
        fn show_alert(&self, alert: Alert) {
            self.shown.lock().unwrap().push(alert);
        }
    }

    fn standalone() -> PlatformCapabilities {
        PlatformCapabilities {
            platform: Platform::Ios,
            app_ownership: AppOwnership::Standalone,
            sandbox_client_configured: false,
        }
    }

    fn success_with_token(token: &str) -> PromptResult {
        let mut params = HashMap::new();
        params.insert("id_token".to_string(), token.to_string());
        params.insert("state".to_string(), "s".to_string());
        PromptResult::Success { params }
    }

    async fn mounted(
        session: &Arc<FakeSession>,
        prompt: &Arc<FakePrompt>,
        alerts: &Arc<RecordingAlerts>,
        capabilities: PlatformCapabilities,
    ) -> SignInController {
        let controller = SignInController::mount(
            session.clone(),
            prompt.clone(),
            alerts.clone(),
            capabilities,
            None,
        );
        controller
            .watch()
            .wait_for(|state| !state.initializing)
            .await
            .unwrap();
        controller
    }

    #[test]
    fn test_capabilities_resolve() {
        let env = StaticEnvironment::new(Platform::Android, "com.example.app:/oauth")
            .with_ownership(AppOwnership::Sandbox);
        let google = GoogleAuthConfig {
            expo_client_id: Some("expo-id".to_string()),
            ..Default::default()
        };

        let capabilities = PlatformCapabilities::resolve(&env, &google);
        assert_eq!(capabilities.platform, Platform::Android);
        assert!(capabilities.is_sandbox());
        assert!(!capabilities.sandbox_client_missing());
        assert!(capabilities.prompt_options().use_proxy);
        assert!(capabilities.prompt_options().show_in_recents);

        let unconfigured = PlatformCapabilities::resolve(&env, &GoogleAuthConfig::default());
        assert!(unconfigured.sandbox_client_missing());

        assert!(!standalone().sandbox_client_missing());
        assert!(!standalone().prompt_options().use_proxy);
    }

    #[tokio::test]
    async fn test_initial_notification_clears_initializing() {
        let session = FakeSession::new();
        session.publish(Some(user("uid-1")));
        let prompt = FakePrompt::returning(Ok(PromptResult::Dismissed));
        let alerts = Arc::new(RecordingAlerts::default());

        let controller = SignInController::mount(
            session.clone(),
            prompt.clone(),
            alerts.clone(),
            standalone(),
            None,
        );
        assert!(controller.state().initializing);
        assert_eq!(controller.view(), ScreenView::Loading);

        let state = controller
            .watch()
            .wait_for(|state| !state.initializing)
            .await
            .unwrap()
            .clone();
        assert_eq!(state.current_user, Some(user("uid-1")));
    }

    #[tokio::test]
    async fn test_state_mirrors_latest_notification() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(PromptResult::Dismissed));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;
        let mut screen = controller.watch();

        for next in [Some(user("a")), None, Some(user("b"))] {
            session.publish(next.clone());
            screen
                .wait_for(|state| state.current_user == next)
                .await
                .unwrap();
        }

        assert_eq!(controller.state().current_user, Some(user("b")));
    }

    #[tokio::test]
    async fn test_sign_in_not_ready() {
        let session = FakeSession::new();
        let prompt = FakePrompt::not_ready();
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;
        let mut screen = controller.watch();
        screen.borrow_and_update();

        let outcome = controller.sign_in().await;

        assert_eq!(outcome, SignInOutcome::NotReady);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
        assert!(!screen.has_changed().unwrap());
        assert_eq!(alerts.titles(), vec![messages::NOT_READY_TITLE.to_string()]);
    }

    #[tokio::test]
    async fn test_sign_in_sandbox_client_missing() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(success_with_token("t")));
        let alerts = Arc::new(RecordingAlerts::default());
        let sandbox = PlatformCapabilities {
            platform: Platform::Ios,
            app_ownership: AppOwnership::Sandbox,
            sandbox_client_configured: false,
        };
        let controller = mounted(&session, &prompt, &alerts, sandbox).await;

        let outcome = controller.sign_in().await;

        assert_eq!(outcome, SignInOutcome::SandboxClientMissing);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
        assert!(!controller.state().authenticating);
        assert_eq!(
            alerts.titles(),
            vec![messages::SANDBOX_UNSUPPORTED_TITLE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_not_ready_checked_before_sandbox() {
        let session = FakeSession::new();
        let prompt = FakePrompt::not_ready();
        let alerts = Arc::new(RecordingAlerts::default());
        let sandbox = PlatformCapabilities {
            platform: Platform::Android,
            app_ownership: AppOwnership::Sandbox,
            sandbox_client_configured: false,
        };
        let controller = mounted(&session, &prompt, &alerts, sandbox).await;

        assert_eq!(controller.sign_in().await, SignInOutcome::NotReady);
        assert_eq!(alerts.titles(), vec![messages::NOT_READY_TITLE.to_string()]);
    }

    #[tokio::test]
    async fn test_sign_in_dismissed_is_silent() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(PromptResult::Dismissed));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;
        let before = controller.state();

        let outcome = controller.sign_in().await;

        assert_eq!(outcome, SignInOutcome::Dismissed);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), before);
        assert!(alerts.titles().is_empty());
        assert_eq!(session.credential_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_in_success_exchanges_once() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(success_with_token("eyJ.token")));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        let outcome = controller.sign_in().await;

        assert_eq!(outcome, SignInOutcome::Submitted);
        assert_eq!(session.credential_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.sign_in_calls.load(Ordering::SeqCst), 1);
        assert!(!controller.state().authenticating);
        assert!(alerts.titles().is_empty());

        let state = controller
            .watch()
            .wait_for(|state| state.current_user.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(state.current_user.unwrap().uid, "uid-google");
    }

    #[tokio::test]
    async fn test_sign_in_waits_for_backend_to_report_user() {
        let session = FakeSession::new();
        session.publish_on_sign_in.store(false, Ordering::SeqCst);
        let prompt = FakePrompt::returning(Ok(success_with_token("eyJ.token")));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        assert_eq!(controller.sign_in().await, SignInOutcome::Submitted);
        tokio::task::yield_now().await;

        // Accepted by the backend but not yet reported: no local user.
        assert_eq!(controller.state().current_user, None);
    }

    #[tokio::test]
    async fn test_sign_in_backend_failure() {
        let session = FakeSession::new();
        session.fail_sign_in.store(true, Ordering::SeqCst);
        let prompt = FakePrompt::returning(Ok(success_with_token("eyJ.token")));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        let outcome = controller.sign_in().await;

        assert_eq!(outcome, SignInOutcome::Failed);
        assert_eq!(session.credential_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.sign_in_calls.load(Ordering::SeqCst), 1);
        assert!(!controller.state().authenticating);
        assert_eq!(controller.state().current_user, None);
        assert_eq!(alerts.titles(), vec![messages::ERROR_TITLE.to_string()]);
    }

    #[tokio::test]
    async fn test_sign_in_prompt_failure() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Err(AuthError::PromptFailed(
            "browser unavailable".to_string(),
        )));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        assert_eq!(controller.sign_in().await, SignInOutcome::Failed);
        assert!(!controller.state().authenticating);
        assert_eq!(session.credential_calls.load(Ordering::SeqCst), 0);
        assert_eq!(alerts.titles(), vec![messages::ERROR_TITLE.to_string()]);
    }

    #[tokio::test]
    async fn test_success_without_token_is_cancelled() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(PromptResult::Success {
            params: HashMap::new(),
        }));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        let outcome = controller.sign_in().await;

        assert_eq!(
            outcome,
            SignInOutcome::Cancelled {
                reason: "missing_id_token".to_string()
            }
        );
        assert_eq!(session.credential_calls.load(Ordering::SeqCst), 0);
        assert_eq!(alerts.titles(), vec![messages::CANCELLED_TITLE.to_string()]);
    }

    #[tokio::test]
    async fn test_other_results_are_cancelled() {
        let results = [
            PromptResult::Cancelled,
            PromptResult::Locked,
            PromptResult::Error {
                code: "access_denied".to_string(),
                description: None,
            },
        ];

        for result in results {
            let session = FakeSession::new();
            let prompt = FakePrompt::returning(Ok(result));
            let alerts = Arc::new(RecordingAlerts::default());
            let controller = mounted(&session, &prompt, &alerts, standalone()).await;

            let outcome = controller.sign_in().await;

            assert!(matches!(outcome, SignInOutcome::Cancelled { .. }));
            assert!(!controller.state().authenticating);
            assert_eq!(alerts.titles(), vec![messages::CANCELLED_TITLE.to_string()]);
        }
    }

    #[tokio::test]
    async fn test_notifications_win_during_sign_in() {
        let session = FakeSession::new();
        let gate = Arc::new(Notify::new());
        let prompt = FakePrompt::gated(PromptResult::Dismissed, gate.clone());
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = Arc::new(mounted(&session, &prompt, &alerts, standalone()).await);
        let mut screen = controller.watch();

        let attempt = tokio::spawn({
            let controller = controller.clone();
            async move { controller.sign_in().await }
        });
        screen.wait_for(|state| state.authenticating).await.unwrap();

        // A second click while the prompt is open does nothing.
        assert_eq!(controller.sign_in().await, SignInOutcome::AlreadyInProgress);

        session.publish(Some(user("elsewhere")));
        let state = screen
            .wait_for(|state| state.current_user.is_some())
            .await
            .unwrap()
            .clone();
        assert!(state.authenticating);

        gate.notify_one();
        assert_eq!(attempt.await.unwrap(), SignInOutcome::Dismissed);

        let state = controller.state();
        assert!(!state.authenticating);
        assert_eq!(state.current_user, Some(user("elsewhere")));
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sign_out_calls_backend_once() {
        let session = FakeSession::new();
        session.publish(Some(user("uid-1")));
        let prompt = FakePrompt::returning(Ok(PromptResult::Dismissed));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        assert_eq!(controller.sign_out().await, SignOutOutcome::Requested);
        assert_eq!(session.sign_out_calls.load(Ordering::SeqCst), 1);

        controller
            .watch()
            .wait_for(|state| state.current_user.is_none())
            .await
            .unwrap();
        assert!(alerts.titles().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_failure_keeps_user() {
        let session = FakeSession::new();
        session.publish(Some(user("uid-1")));
        session.fail_sign_out.store(true, Ordering::SeqCst);
        let prompt = FakePrompt::returning(Ok(PromptResult::Dismissed));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;

        assert_eq!(controller.sign_out().await, SignOutOutcome::Failed);
        assert_eq!(session.sign_out_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state().current_user, Some(user("uid-1")));
        assert_eq!(alerts.titles(), vec![messages::ERROR_TITLE.to_string()]);
    }

    #[tokio::test]
    async fn test_unmount_releases_subscription() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(PromptResult::Dismissed));
        let alerts = Arc::new(RecordingAlerts::default());
        let controller = mounted(&session, &prompt, &alerts, standalone()).await;
        let screen = controller.watch();
        assert_eq!(session.state.receiver_count(), 1);

        controller.unmount().await;
        assert_eq!(session.state.receiver_count(), 0);

        session.publish(Some(user("late")));
        tokio::task::yield_now().await;
        assert_eq!(screen.borrow().current_user, None);
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let session = FakeSession::new();
        let prompt = FakePrompt::returning(Ok(PromptResult::Cancelled));
        let alerts = Arc::new(RecordingAlerts::default());
        let event_bus = EventBus::new(16);
        let mut events = event_bus.subscribe();

        let controller = SignInController::mount(
            session.clone(),
            prompt.clone(),
            alerts.clone(),
            standalone(),
            Some(event_bus),
        );
        controller.sign_in().await;

        assert_eq!(events.try_recv().unwrap(), CoreEvent::Ui(UiEvent::ScreenMounted));
        assert!(matches!(
            events.try_recv().unwrap(),
            CoreEvent::Auth(AuthEvent::SigningIn { .. })
        ));
        assert_eq!(
            events.try_recv().unwrap(),
            CoreEvent::Auth(AuthEvent::SignInCancelled {
                provider: "google.com".to_string(),
                reason: "cancelled".to_string(),
            })
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            CoreEvent::Ui(UiEvent::AlertShown { .. })
        ));
    }
}
