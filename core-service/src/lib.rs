//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, auth-session
//! browser, alerts, environment, configuration) into the sign-in core. Desktop
//! apps typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`); mobile and web hosts pass their own adapters to
//! [`CoreService::bootstrap`].
//!
//! Startup order is fixed: configuration is resolved first and a missing
//! backend section aborts before any session client or screen exists.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    alert::AlertPresenter,
    browser::AuthSessionBrowser,
    environment::{ConfigSource, HostEnvironment},
    http::HttpClient,
};
use core_auth::{
    controller::{PlatformCapabilities, SignInController},
    oauth::{AuthPrompt, GoogleAuthRequest, GoogleAuthRequestConfig},
    session::SessionClient,
};
use core_runtime::{config::AppConfig, events::EventBus};
use tracing::{debug, info, instrument, warn};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub config_source: Arc<dyn ConfigSource>,
    pub environment: Arc<dyn HostEnvironment>,
    pub browser: Arc<dyn AuthSessionBrowser>,
    pub alerts: Arc<dyn AlertPresenter>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        config_source: Arc<dyn ConfigSource>,
        environment: Arc<dyn HostEnvironment>,
        browser: Arc<dyn AuthSessionBrowser>,
        alerts: Arc<dyn AlertPresenter>,
    ) -> Self {
        Self {
            http_client,
            config_source,
            environment,
            browser,
            alerts,
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    config: Arc<AppConfig>,
    session: Arc<dyn SessionClient>,
    prompt: Arc<GoogleAuthRequest>,
    capabilities: PlatformCapabilities,
    event_bus: EventBus,
}

impl CoreService {
    /// Resolve configuration, initialize the process-wide session client and
    /// prepare the Google auth request.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Config`] when the configuration lacks the
    /// backend section. Nothing else is initialized in that case.
    #[instrument(skip(deps))]
    pub async fn bootstrap(deps: CoreDependencies) -> Result<Self> {
        let event_bus = EventBus::default();
        let config = AppConfig::resolve(deps.config_source.as_ref())?;

        let session: Arc<dyn SessionClient> = core_auth::auth_or_init(
            &config,
            Arc::clone(&deps.http_client),
            Some(event_bus.clone()),
        )?;

        Self::assemble(deps, config, session, event_bus).await
    }

    /// Like [`bootstrap`](Self::bootstrap), with a caller-supplied session
    /// client instead of the process-wide one.
    pub async fn bootstrap_with_session(
        deps: CoreDependencies,
        session: Arc<dyn SessionClient>,
    ) -> Result<Self> {
        let config = AppConfig::resolve(deps.config_source.as_ref())?;
        Self::assemble(deps, config, session, EventBus::default()).await
    }

    async fn assemble(
        deps: CoreDependencies,
        config: AppConfig,
        session: Arc<dyn SessionClient>,
        event_bus: EventBus,
    ) -> Result<Self> {
        if deps.browser.maybe_complete_auth_session() {
            debug!("Completed a pending auth session");
        }

        let environment = deps.environment.as_ref();
        let google = config.google_auth();
        let platform = environment.platform();
        let ownership = environment.app_ownership();

        let client_id = google.client_id_for(platform, ownership).map(str::to_string);
        if client_id.is_none() {
            warn!(
                %platform,
                ?ownership,
                "No Google client id configured; sign-in is unavailable"
            );
        }

        let request_config = GoogleAuthRequestConfig::new(client_id, environment.redirect_uri())
            .with_proxy_redirect(environment.proxy_redirect_uri());
        let prompt = Arc::new(GoogleAuthRequest::new(
            request_config,
            Arc::clone(&deps.browser),
        ));
        prompt.prepare().await?;

        let capabilities = PlatformCapabilities::resolve(environment, &google);
        info!(
            %platform,
            sandbox = capabilities.is_sandbox(),
            sandbox_client_missing = capabilities.sandbox_client_missing(),
            "Core bootstrapped"
        );

        Ok(Self {
            deps: Arc::new(deps),
            config: Arc::new(config),
            session,
            prompt,
            capabilities,
            event_bus,
        })
    }

    /// Mount a sign-in screen controller. Must be called inside a Tokio runtime.
    pub fn mount_sign_in_screen(&self) -> SignInController {
        SignInController::mount(
            Arc::clone(&self.session),
            Arc::clone(&self.prompt) as Arc<dyn AuthPrompt>,
            Arc::clone(&self.deps.alerts),
            self.capabilities,
            Some(self.event_bus.clone()),
        )
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> Arc<dyn SessionClient> {
        Arc::clone(&self.session)
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Installs the global subscriber from `logging` (pass `None` when the host
/// already owns logging), reads the manifest named by `SIGNIN_APP_CONFIG` (or
/// `./app.json`), talks to the backend over reqwest and runs the Google prompt
/// in the system browser.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// use bridge_traits::environment::{Platform, StaticEnvironment};
/// use core_runtime::logging::LoggingConfig;
///
/// let environment =
///     StaticEnvironment::new(Platform::Desktop, "http://127.0.0.1:17435/callback");
/// let core =
///     core_service::bootstrap_desktop(environment, Some(LoggingConfig::from_env())).await?;
/// let controller = core.mount_sign_in_screen();
/// controller.sign_in().await;
/// # Ok(())
/// # }
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(
    environment: bridge_traits::environment::StaticEnvironment,
    logging: Option<core_runtime::logging::LoggingConfig>,
) -> Result<CoreService> {
    use bridge_desktop::{
        AppManifestSource, ConsoleAlertPresenter, LoopbackBrowserSession, ReqwestHttpClient,
    };

    if let Some(config) = logging {
        core_runtime::logging::init_logging(config)?;
    }

    let deps = CoreDependencies::new(
        Arc::new(ReqwestHttpClient::new()?),
        Arc::new(AppManifestSource::from_env()?),
        Arc::new(environment),
        Arc::new(LoopbackBrowserSession::new()),
        Arc::new(ConsoleAlertPresenter::new()),
    );
    CoreService::bootstrap(deps).await
}
