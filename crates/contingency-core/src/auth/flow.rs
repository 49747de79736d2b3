//! Installed-app OAuth flow with a loopback redirect.
//!
//! Flow:
//! 1. Bind a listener on 127.0.0.1 and use it as the redirect URI
//! 2. Open the consent URL (state + PKCE challenge) in the browser
//! 3. Wait for the browser to hit the redirect with `code`
//! 4. Exchange the code at the token endpoint
//!
//! Refreshing an expired credential goes through the same token endpoint.

use super::client_secret::ClientSecret;
use super::credentials::TokenResponse;
use super::{AuthError, Credential};
use crate::config::AuthConfig;
use crate::utils::browser::open_browser;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use url::Url;
use uuid::Uuid;

const SUCCESS_PAGE: &str = "<html><body><h3>Authentication complete.</h3>\
<p>You can close this window and return to the terminal.</p></body></html>";
const ERROR_PAGE: &str = "<html><body><h3>Authentication failed.</h3>\
<p>Return to the terminal for details.</p></body></html>";

/// PKCE verifier/challenge pair (S256)
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        Self::from_verifier(verifier)
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Consent screen URL for the installed-app flow.
pub fn authorization_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    pkce: &Pkce,
) -> Result<Url, AuthError> {
    let mut url = Url::parse(&secret.auth_uri)
        .map_err(|e| AuthError::ClientSecret(format!("invalid auth_uri: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &secret.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", &scopes.join(" "))
        .append_pair("state", state)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", "S256");

    Ok(url)
}

/// What a request to the loopback listener carried
#[derive(Debug, PartialEq)]
pub enum Callback {
    Code(String),
    Error(String),
    /// Unrelated request (favicon, health check)
    Ignored,
}

/// Parse the request line of a redirect hit, e.g.
/// `GET /?state=abc&code=4/0Ab HTTP/1.1`.
pub fn parse_callback(request_line: &str, expected_state: &str) -> Result<Callback, AuthError> {
    let target = match request_line.split_whitespace().nth(1) {
        Some(target) => target,
        None => return Ok(Callback::Ignored),
    };

    let base = Url::parse("http://localhost/").map_err(|e| AuthError::Denied(e.to_string()))?;
    let url = match base.join(target) {
        Ok(url) => url,
        Err(_) => return Ok(Callback::Ignored),
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if code.is_none() && error.is_none() {
        return Ok(Callback::Ignored);
    }
    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    match (code, error) {
        (_, Some(error)) => Ok(Callback::Error(error)),
        (Some(code), None) => Ok(Callback::Code(code)),
        (None, None) => Ok(Callback::Ignored),
    }
}

/// Loopback listener receiving the OAuth redirect
pub struct LoopbackServer {
    listener: TcpListener,
    port: u16,
}

impl LoopbackServer {
    /// Bind 127.0.0.1; port 0 picks a free port.
    pub fn bind(port: u16) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/", self.port)
    }

    /// Block until a redirect with a code (or an error) arrives.
    ///
    /// A connection that fails before a callback is read is logged and
    /// skipped. Once the callback is parsed, a failure to answer the
    /// browser does not change the outcome.
    pub fn wait_for_code(&self, expected_state: &str) -> Result<String, AuthError> {
        for stream in self.listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Loopback accept failed: {}", e);
                    continue;
                }
            };
            let request_line = match read_request_line(&stream) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Dropping loopback connection: {}", e);
                    continue;
                }
            };
            tracing::debug!("Loopback request: {}", request_line.trim());

            let callback = parse_callback(&request_line, expected_state);
            let (status, page) = match &callback {
                Ok(Callback::Code(_)) => ("200 OK", SUCCESS_PAGE),
                Ok(Callback::Error(_)) => ("200 OK", ERROR_PAGE),
                Ok(Callback::Ignored) => ("404 Not Found", ""),
                Err(_) => ("400 Bad Request", ERROR_PAGE),
            };
            if let Err(e) = respond(&mut stream, status, page) {
                tracing::warn!("Cannot answer loopback request: {}", e);
            }

            match callback {
                Ok(Callback::Code(code)) => return Ok(code),
                Ok(Callback::Error(error)) => return Err(AuthError::Denied(error)),
                Ok(Callback::Ignored) => {}
                Err(e) => return Err(e),
            }
        }
        Err(AuthError::Denied("loopback listener closed".to_string()))
    }
}

/// Read the request line and drain the headers, so closing the socket
/// after responding does not reset the connection.
fn read_request_line(stream: &TcpStream) -> Result<String, AuthError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let mut header = String::new();
    loop {
        header.clear();
        let read = reader.read_line(&mut header)?;
        if read == 0 || header.trim().is_empty() {
            break;
        }
    }
    Ok(request_line)
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<(), AuthError> {
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )?;
    stream.flush()?;
    Ok(())
}

/// Receives the consent URL and whether a browser was launched.
pub type PromptFn = Box<dyn Fn(&str, bool) + Send + Sync>;

fn default_prompt(url: &str, browser_opened: bool) {
    if browser_opened {
        eprintln!("If the browser did not open, visit:\n  {}", url);
    } else {
        eprintln!("Open this URL in your browser to authorize:\n  {}", url);
    }
}

/// Talks to the provider's OAuth endpoints.
pub struct OAuthAuthorizer {
    client: reqwest::blocking::Client,
    client_secret_path: PathBuf,
    redirect_port: u16,
    open_browser: bool,
    prompt: PromptFn,
}

impl OAuthAuthorizer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            client_secret_path: config.client_secret_path.clone(),
            redirect_port: config.redirect_port,
            open_browser: config.open_browser,
            prompt: Box::new(default_prompt),
        }
    }

    /// Replace how the consent URL is shown to the user
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.prompt = Box::new(prompt);
        self
    }

    fn request_token(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self.client.post(token_uri).form(form).send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(AuthError::TokenEndpoint { status, body });
        }

        Ok(response.json()?)
    }

    /// Exchange a refresh token for a new access token.
    pub fn refresh_credential(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::Denied("no refresh token".to_string()))?;

        // Older caches may lack the client fields
        let (client_id, client_secret, token_uri) = match (
            &credential.client_id,
            &credential.client_secret,
            &credential.token_uri,
        ) {
            (Some(id), Some(secret), Some(uri)) => (id.clone(), secret.clone(), uri.clone()),
            _ => {
                let secret = ClientSecret::load(&self.client_secret_path)?;
                (secret.client_id, secret.client_secret, secret.token_uri)
            }
        };

        tracing::info!("Refreshing access token");
        let response = self.request_token(
            &token_uri,
            &[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )?;

        let mut refreshed =
            Credential::from_token_response(response, Some(credential), &[], Utc::now())?;
        refreshed.client_id = Some(client_id);
        refreshed.client_secret = Some(client_secret);
        refreshed.token_uri = Some(token_uri);
        Ok(refreshed)
    }

    /// Run the interactive browser consent and return a fresh credential.
    pub fn run_local_server(&self, scopes: &[String]) -> Result<Credential, AuthError> {
        let secret = ClientSecret::load(&self.client_secret_path)?;
        let server = LoopbackServer::bind(self.redirect_port)?;
        let redirect_uri = server.redirect_uri();
        let state = Uuid::new_v4().to_string();
        let pkce = Pkce::generate();

        let url = authorization_url(&secret, &redirect_uri, scopes, &state, &pkce)?;
        tracing::info!("Waiting for OAuth redirect on {}", redirect_uri);

        let opened = self.open_browser && open_browser(url.as_str());
        (self.prompt)(url.as_str(), opened);

        let code = server.wait_for_code(&state)?;
        let response = self.request_token(
            &secret.token_uri,
            &[
                ("code", code.as_str()),
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
                ("code_verifier", pkce.verifier.as_str()),
            ],
        )?;

        let mut credential = Credential::from_token_response(response, None, scopes, Utc::now())?;
        credential.client_id = Some(secret.client_id);
        credential.client_secret = Some(secret.client_secret);
        credential.token_uri = Some(secret.token_uri);
        tracing::info!("Authorization complete");
        Ok(credential)
    }
}
