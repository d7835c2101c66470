//! System browser auth session with a loopback redirect listener.
//!
//! The authorization URL is opened in the user's default browser and the
//! provider redirects to `http://127.0.0.1:<port>/<path>`. Identity tokens
//! arrive in the URL fragment, which browsers never send to a server, so the
//! first request is answered with a small page that re-issues the request with
//! the fragment moved into the query string.

use async_trait::async_trait;
use bridge_traits::{
    browser::{AuthSessionBrowser, AuthSessionOptions, BrowserResult},
    error::{BridgeError, Result},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

/// How long to wait for the provider to redirect back.
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// How long a single loopback connection may take to send its request line.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

const FRAGMENT_BRIDGE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Signing in</title></head>
<body>
<p>Completing sign-in...</p>
<script>
  var params = window.location.hash.substring(1);
  window.location.replace(window.location.pathname + "?" + (params || "error=missing_response"));
</script>
</body>
</html>"#;

const DONE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Signed in</title></head>
<body><p>You can close this window and return to the app.</p></body>
</html>"#;

type Opener = Box<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Auth session backed by the system browser.
pub struct LoopbackBrowserSession {
    timeout: Duration,
    busy: AtomicBool,
    opener: Opener,
}

/// Clears the busy flag when a session ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Request {
    /// Redirect carrying parameters in the query string.
    Redirect(String),
    /// Redirect whose parameters are still in the fragment.
    Bare,
    Other,
}

impl LoopbackBrowserSession {
    pub fn new() -> Self {
        Self::with_opener(|url| open::that(url))
    }

    /// Use a custom launcher instead of the default browser.
    pub fn with_opener(
        opener: impl Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            timeout: DEFAULT_SESSION_TIMEOUT,
            busy: AtomicBool::new(false),
            opener: Box::new(opener),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn loopback_address(return_url: &Url) -> Result<String> {
        let host = return_url.host_str().unwrap_or_default();
        let is_loopback = matches!(host, "127.0.0.1" | "localhost" | "[::1]");
        match (return_url.scheme(), is_loopback, return_url.port()) {
            ("http", true, Some(port)) => Ok(format!("{}:{}", host, port)),
            _ => Err(BridgeError::NotAvailable(format!(
                "Desktop auth sessions need an http loopback return URL with a port, got {}",
                return_url
            ))),
        }
    }

    async fn wait_for_redirect(listener: TcpListener, return_url: &Url) -> Result<String> {
        let (redirects, mut received) = mpsc::channel(1);
        // Dropping the set aborts connections still being served.
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, _) = accepted?;
                    connections.spawn(Self::serve(socket, return_url.clone(), redirects.clone()));
                }
                Some(redirect) = received.recv() => return Ok(redirect),
            }
        }
    }

    /// Answer one loopback connection. Browsers open speculative connections
    /// that never send a request, so each read is bounded.
    async fn serve(mut socket: TcpStream, return_url: Url, redirects: mpsc::Sender<String>) {
        let read = timeout(
            REQUEST_READ_TIMEOUT,
            Self::read_request(&mut socket, return_url.path()),
        )
        .await;

        match read {
            Ok(Ok(Request::Redirect(query))) => {
                Self::respond(&mut socket, 200, "OK", DONE_PAGE).await.ok();
                let mut redirect = return_url;
                redirect.set_query(Some(&query));
                redirects.send(redirect.to_string()).await.ok();
            }
            Ok(Ok(Request::Bare)) => {
                Self::respond(&mut socket, 200, "OK", FRAGMENT_BRIDGE_PAGE)
                    .await
                    .ok();
            }
            Ok(Ok(Request::Other)) => {
                Self::respond(&mut socket, 404, "Not Found", "Not Found").await.ok();
            }
            Ok(Err(err)) => warn!(error = %err, "Failed to read loopback request"),
            Err(_) => debug!("Closing idle loopback connection"),
        }
    }

    async fn read_request(socket: &mut TcpStream, expected_path: &str) -> Result<Request> {
        let mut reader = BufReader::new(socket);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;

        // Drain headers so closing the socket does not reset the connection.
        let mut header = String::new();
        loop {
            header.clear();
            let read = reader.read_line(&mut header).await?;
            if read == 0 || header.trim().is_empty() {
                break;
            }
        }

        let Some(target) = request_line
            .strip_prefix("GET ")
            .and_then(|rest| rest.split_whitespace().next())
        else {
            return Ok(Request::Other);
        };

        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        debug!(path, has_query = !query.is_empty(), "Loopback request");

        Ok(match (path == expected_path, query.is_empty()) {
            (true, false) => Request::Redirect(query.to_string()),
            (true, true) => Request::Bare,
            (false, _) => Request::Other,
        })
    }

    async fn respond(socket: &mut TcpStream, status: u16, reason: &str, body: &str) -> Result<()> {
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }
}

impl Default for LoopbackBrowserSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthSessionBrowser for LoopbackBrowserSession {
    async fn open_auth_session(
        &self,
        auth_url: &str,
        return_url: &str,
        options: AuthSessionOptions,
    ) -> Result<BrowserResult> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Ok(BrowserResult::Locked);
        }
        let _busy = BusyGuard(&self.busy);

        let return_url = Url::parse(return_url)
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid return URL: {}", e)))?;
        let address = Self::loopback_address(&return_url)?;

        let listener = TcpListener::bind(&address).await?;
        debug!(%address, ?options, "Loopback listener ready");

        (self.opener)(auth_url).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to open the system browser: {}", e))
        })?;
        info!("Opened system browser for sign-in");

        match timeout(self.timeout, Self::wait_for_redirect(listener, &return_url))
            .await
        {
            Ok(redirect) => Ok(BrowserResult::Success { url: redirect? }),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Auth session timed out");
                Ok(BrowserResult::Cancel)
            }
        }
    }
}
