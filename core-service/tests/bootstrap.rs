use async_trait::async_trait;
use bridge_traits::{
    alert::{Alert, AlertPresenter},
    browser::{AuthSessionBrowser, AuthSessionOptions, BrowserResult},
    environment::{AppOwnership, ConfigSource, Platform, StaticEnvironment},
    error::{BridgeError, Result as BridgeResult},
    http::{HttpClient, HttpRequest, HttpResponse},
};
use core_auth::{
    session::{AuthStateSubscription, SessionClient},
    AuthError, CurrentUser, GoogleCredential, ScreenView, SignInOutcome,
};
use core_service::{CoreDependencies, CoreError, CoreService};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

struct JsonSource(Option<serde_json::Value>);

impl ConfigSource for JsonSource {
    fn app_config_extra(&self) -> Option<serde_json::Value> {
        self.0.clone()
    }
}

struct OfflineHttpClient;

#[async_trait]
impl HttpClient for OfflineHttpClient {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Err(BridgeError::NotAvailable("offline".to_string()))
    }
}

/// Browser that completes every session with an identity token.
#[derive(Default)]
struct EchoBrowser {
    sessions: AtomicUsize,
    completions: AtomicUsize,
}

#[async_trait]
impl AuthSessionBrowser for EchoBrowser {
    async fn open_auth_session(
        &self,
        auth_url: &str,
        return_url: &str,
        _options: AuthSessionOptions,
    ) -> BridgeResult<BrowserResult> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let state = url::Url::parse(auth_url)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        Ok(BrowserResult::Success {
            url: format!("{}#id_token=google-id-token&state={}", return_url, state),
        })
    }

    fn maybe_complete_auth_session(&self) -> bool {
        self.completions.fetch_add(1, Ordering::SeqCst);
        false
    }
}

#[derive(Default)]
struct RecordingAlerts(Mutex<Vec<Alert>>);

impl AlertPresenter for RecordingAlerts {
    fn show_alert(&self, alert: Alert) {
        self.0.lock().unwrap().push(alert);
    }
}

struct FakeSession {
    state: watch::Sender<Option<CurrentUser>>,
    sign_ins: AtomicUsize,
}

impl FakeSession {
    fn new() -> Arc<Self> {
        let (state, _) = watch::channel(None);
        Arc::new(Self {
            state,
            sign_ins: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SessionClient for FakeSession {
    fn credential_from_id_token(&self, _id_token: &str) -> core_auth::Result<GoogleCredential> {
        Err(AuthError::InvalidCredential("rejected by fake backend".to_string()))
    }

    async fn sign_in_with_credential(
        &self,
        _credential: GoogleCredential,
    ) -> core_auth::Result<CurrentUser> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        Err(AuthError::NotAuthenticated)
    }

    async fn sign_out(&self) -> core_auth::Result<()> {
        self.state.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<CurrentUser> {
        self.state.borrow().clone()
    }

    fn on_auth_state_changed(&self) -> AuthStateSubscription {
        AuthStateSubscription::new(self.state.subscribe())
    }
}

fn extra() -> serde_json::Value {
    json!({
        "firebase": { "apiKey": "api-key", "projectId": "demo-project" },
        "googleAuth": {
            "iosClientId": "ios.apps.googleusercontent.com",
            "webClientId": "web.apps.googleusercontent.com"
        }
    })
}

fn deps(
    extra: Option<serde_json::Value>,
    environment: StaticEnvironment,
    browser: Arc<EchoBrowser>,
    alerts: Arc<RecordingAlerts>,
) -> CoreDependencies {
    CoreDependencies::new(
        Arc::new(OfflineHttpClient),
        Arc::new(JsonSource(extra)),
        Arc::new(environment),
        browser,
        alerts,
    )
}

#[tokio::test]
async fn test_missing_backend_config_aborts_startup() {
    let browser = Arc::new(EchoBrowser::default());
    let alerts = Arc::new(RecordingAlerts::default());
    let environment = StaticEnvironment::new(Platform::Ios, "com.example.app:/oauth");

    let result = CoreService::bootstrap(deps(
        Some(json!({ "googleAuth": { "iosClientId": "ios" } })),
        environment,
        browser.clone(),
        alerts.clone(),
    ))
    .await;

    match result {
        Err(CoreError::Config(err)) => {
            assert!(err
                .to_string()
                .contains("Firebase config is not defined under expo.extra.firebase"));
        }
        Err(other) => panic!("Expected config error, got {:?}", other),
        Ok(_) => panic!("Bootstrap must fail without a firebase section"),
    }
    assert_eq!(browser.completions.load(Ordering::SeqCst), 0);
    assert!(alerts.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bootstrap_uses_process_session_client() {
    let environment = StaticEnvironment::new(Platform::Web, "https://example.com/auth");

    let first = CoreService::bootstrap(deps(
        Some(extra()),
        environment.clone(),
        Arc::new(EchoBrowser::default()),
        Arc::new(RecordingAlerts::default()),
    ))
    .await
    .unwrap();
    let second = CoreService::bootstrap(deps(
        Some(extra()),
        environment,
        Arc::new(EchoBrowser::default()),
        Arc::new(RecordingAlerts::default()),
    ))
    .await
    .unwrap();

    let a = Arc::as_ptr(&first.session()) as *const ();
    let b = Arc::as_ptr(&second.session()) as *const ();
    assert_eq!(a, b);
    assert_eq!(first.config().firebase.api_key(), "api-key");
}

#[tokio::test]
async fn test_sign_in_reaches_backend_with_prompt_token() {
    let browser = Arc::new(EchoBrowser::default());
    let alerts = Arc::new(RecordingAlerts::default());
    let environment = StaticEnvironment::new(Platform::Ios, "com.example.app:/oauth");
    let session = FakeSession::new();

    let core = CoreService::bootstrap_with_session(
        deps(Some(extra()), environment, browser.clone(), alerts.clone()),
        session.clone(),
    )
    .await
    .unwrap();
    assert_eq!(browser.completions.load(Ordering::SeqCst), 1);

    let controller = core.mount_sign_in_screen();
    controller
        .watch()
        .wait_for(|state| !state.initializing)
        .await
        .unwrap();
    assert!(matches!(
        controller.view(),
        ScreenView::SignedOut {
            sign_in_enabled: true,
            ..
        }
    ));

    // The fake backend rejects the token before any sign-in request.
    assert_eq!(controller.sign_in().await, SignInOutcome::Failed);
    assert_eq!(browser.sessions.load(Ordering::SeqCst), 1);
    assert_eq!(session.sign_ins.load(Ordering::SeqCst), 0);
    assert_eq!(alerts.0.lock().unwrap()[0].title, "Error");
    assert!(!controller.state().authenticating);

    controller.unmount().await;
}

#[tokio::test]
async fn test_unconfigured_sandbox_disables_sign_in() {
    let browser = Arc::new(EchoBrowser::default());
    let alerts = Arc::new(RecordingAlerts::default());
    let environment = StaticEnvironment::new(Platform::Android, "com.example.app:/oauth")
        .with_ownership(AppOwnership::Sandbox)
        .with_proxy_redirect("https://auth.expo.io/@owner/app");

    let core = CoreService::bootstrap_with_session(
        deps(Some(extra()), environment, browser.clone(), alerts.clone()),
        FakeSession::new(),
    )
    .await
    .unwrap();
    assert!(core.capabilities().sandbox_client_missing());

    let controller = core.mount_sign_in_screen();
    controller
        .watch()
        .wait_for(|state| !state.initializing)
        .await
        .unwrap();

    match controller.view() {
        ScreenView::SignedOut {
            sign_in_enabled,
            warning,
            ..
        } => {
            assert!(!sign_in_enabled);
            assert!(warning.is_some());
        }
        other => panic!("Expected signed-out card, got {:?}", other),
    }

    assert_eq!(
        controller.sign_in().await,
        SignInOutcome::SandboxClientMissing
    );
    assert_eq!(browser.sessions.load(Ordering::SeqCst), 0);
    assert_eq!(alerts.0.lock().unwrap().len(), 1);
}
