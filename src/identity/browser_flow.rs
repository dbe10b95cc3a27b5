//! Login redirect flow
//!
//! 1. Start `tiny_http` on `127.0.0.1:{port}`
//! 2. Open the browser on the realm's authorization endpoint
//! 3. Wait for the redirect carrying `code` and `state` (in `spawn_blocking`,
//!    `tiny_http::recv` blocks)
//! 4. Hand the authorization code back for the token exchange

use std::time::{Duration, Instant};

use super::error::{AuthError, AuthResult};

/// Authorization code received on the local callback
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationCode {
    pub code: String,
    pub redirect_uri: String,
}

/// Local listener waiting for the identity provider's redirect
pub struct CallbackListener {
    server: tiny_http::Server,
    port: u16,
    state: String,
}

impl CallbackListener {
    /// Bind the callback listener. Port 0 picks a free port.
    pub fn bind(port: u16) -> AuthResult<Self> {
        let server = tiny_http::Server::http(("127.0.0.1", port))
            .map_err(|e| AuthError::BrowserFlow(format!("failed to bind callback: {e}")))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .ok_or_else(|| AuthError::BrowserFlow("callback listener has no port".into()))?;

        Ok(Self {
            server,
            port,
            state: generate_state()?,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// CSRF nonce the authorization request must echo back
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.port)
    }

    /// Wait for the redirect without blocking the runtime
    pub async fn wait(self, timeout: Duration) -> AuthResult<AuthorizationCode> {
        let redirect_uri = self.redirect_uri();
        let code = tokio::task::spawn_blocking(move || {
            wait_for_callback(self.server, timeout, self.state)
        })
        .await
        .map_err(|e| AuthError::BrowserFlow(format!("callback task failed: {e}")))??;

        Ok(AuthorizationCode { code, redirect_uri })
    }
}

/// Open `url` in the user's browser, printing it as a fallback
pub fn open_browser(url: &str) {
    eprintln!("Opening browser to: {url}");
    if let Err(error) = open::that(url) {
        tracing::warn!(%error, "Failed to open browser");
        eprintln!("Open the URL above manually, then return here.");
    }
}

fn generate_state() -> AuthResult<String> {
    let mut nonce = [0u8; 16];
    getrandom::fill(&mut nonce)
        .map_err(|e| AuthError::BrowserFlow(format!("failed to generate state nonce: {e}")))?;
    Ok(nonce.iter().map(|b| format!("{b:02x}")).collect())
}

/// Outcome of one request hitting the callback listener
#[derive(Debug, PartialEq)]
enum CallbackOutcome {
    Code(String),
    /// Not our redirect (favicon, reload without parameters)
    Ignore,
    Failed(String),
}

fn parse_callback(url: &str, expected_state: &str) -> CallbackOutcome {
    let Some(query) = url.strip_prefix("/callback?") else {
        return CallbackOutcome::Ignore;
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = match urlencoding::decode(&value.replace('+', " ")) {
            Ok(v) => v.into_owned(),
            Err(e) => return CallbackOutcome::Failed(format!("URL decode: {e}")),
        };
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return CallbackOutcome::Failed(match description {
            Some(d) => format!("{error}: {d}"),
            None => error,
        });
    }

    let Some(code) = code.filter(|c| !c.is_empty()) else {
        return CallbackOutcome::Ignore;
    };

    if state.as_deref() != Some(expected_state) {
        return CallbackOutcome::Failed("state mismatch, possible CSRF".into());
    }

    CallbackOutcome::Code(code)
}

fn html_response(body: &str) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let response = tiny_http::Response::from_string(format!("<html><body>{body}</body></html>"));
    match tiny_http::Header::from_bytes("Content-Type", "text/html; charset=utf-8") {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Block until the callback receives an authorization code
fn wait_for_callback(
    server: tiny_http::Server,
    timeout: Duration,
    expected_state: String,
) -> AuthResult<String> {
    let deadline = Instant::now() + timeout;
    let timed_out = || {
        AuthError::BrowserFlow(format!(
            "login callback timed out after {}s",
            timeout.as_secs()
        ))
    };

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out());
        }

        let request = match server.recv_timeout(remaining) {
            Ok(Some(req)) => req,
            Ok(None) => return Err(timed_out()),
            Err(e) => return Err(AuthError::BrowserFlow(format!("recv error: {e}"))),
        };

        match parse_callback(request.url(), &expected_state) {
            CallbackOutcome::Code(code) => {
                let _ = request.respond(html_response(
                    "<h1>Logged in</h1><p>You can close this tab.</p>",
                ));
                return Ok(code);
            }
            CallbackOutcome::Ignore => {
                let _ = request.respond(tiny_http::Response::empty(tiny_http::StatusCode(204)));
            }
            CallbackOutcome::Failed(reason) => {
                let _ = request.respond(html_response(
                    "<h1>Login failed</h1><p>Check the terminal output.</p>",
                ));
                return Err(AuthError::BrowserFlow(reason));
            }
        }
    }
}
