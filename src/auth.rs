use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use anyhow::{Context, Result};
use chrono::Utc;
use itertools::Itertools;
use log::*;
use reqwest::Url;
use reqwest::blocking::Client;
use thiserror::Error;
use uuid::Uuid;

use crate::cancel::{CancelToken, POLL_INTERVAL};
use crate::config::{Config, FlowOptions, USER_AGENT};
use crate::model::logical::TokenState;
use crate::model::remote::{OAuthErrorResponse, TokenResponse};
use crate::model::storage::{ClientSecret, Credentials};
use crate::prompt;
use crate::store;

pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/drive.photos.readonly",
    "https://picasaweb.google.com/data/",
];

// Redirect target for the copy-the-code-by-hand flow
const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization was denied: {0}")]
    Denied(String),
    #[error("authorization response does not belong to this request")]
    StateMismatch,
    #[error("stored credentials have no refresh token")]
    NoRefreshToken,
    #[error("token request rejected ({error}): {description}")]
    Rejected { error: String, description: String },
}

/// Load the stored credentials, or run the authorization flow and store the result.
pub fn acquire(config: &Config, http: &Client, cancel: &CancelToken) -> Result<Credentials> {
    store::ensure_dir(&config.app_dir)?;
    let token_path = config.token_path();
    match store::read_credentials(&token_path)? {
        TokenState::Valid(c) => {
            debug!("Using stored credentials from {:?}", token_path);
            return Ok(c);
        },
        TokenState::Invalid(c) => info!("Stored credentials for client {} are invalid, authorizing again", c.client_id),
        TokenState::Absent => info!("No stored credentials, authorizing"),
    }
    let secret = store::read_client_secret(&config.client_secret_path())?;
    let credentials = run_flow(&secret, &config.flow, http, cancel)?;
    store::write_credentials(&token_path, &credentials)?;
    println!("Authentication successful.");
    Ok(credentials)
}

fn run_flow(secret: &ClientSecret, options: &FlowOptions, http: &Client, cancel: &CancelToken) -> Result<Credentials> {
    let state = Uuid::new_v4().to_string();
    let listener = if options.local_webserver {
        bind_first(&options.host, &options.ports)
    } else {
        None
    };
    let (redirect_uri, code) = match listener {
        Some((listener, port)) => {
            let redirect_uri = format!("http://{}:{}/", options.host, port);
            let url = authorization_url(secret, &redirect_uri, &state)?;
            match open_browser(url.as_str()) {
                Ok(()) => println!("Your browser has been opened to visit:\n\n    {}\n", url),
                Err(e) => {
                    debug!("Unable to open a browser: {}", e);
                    println!("Go to the following link in your browser:\n\n    {}\n", url);
                },
            }
            println!("If your browser is on a different machine, exit and re-run with --noauth-local-webserver");
            let code = wait_for_code(&listener, &state, cancel)?;
            (redirect_uri, code)
        },
        None => {
            let url = authorization_url(secret, OOB_REDIRECT, &state)?;
            println!("Go to the following link in your browser:\n\n    {}\n", url);
            let code = prompt::prompt("Enter verification code: ", cancel)?;
            (OOB_REDIRECT.to_owned(), code)
        },
    };
    exchange_code(secret, http, &redirect_uri, &code)
}

fn bind_first(host: &str, ports: &[u16]) -> Option<(TcpListener, u16)> {
    for &port in ports {
        match TcpListener::bind((host, port)) {
            Ok(listener) => {
                let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                debug!("Listening for authorization redirect on {}:{}", host, port);
                return Some((listener, port));
            },
            Err(e) => debug!("Unable to listen on {}:{}: {}", host, port, e),
        }
    }
    warn!("No port available for the local webserver, falling back to manual code entry");
    None
}

pub fn authorization_url(secret: &ClientSecret, redirect_uri: &str, state: &str) -> Result<Url> {
    let scope = SCOPES.iter().join(" ");
    Url::parse_with_params(&secret.auth_uri, &[
        ("response_type", "code"),
        ("client_id", secret.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", scope.as_str()),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("state", state),
    ]).with_context(|| format!("Bad auth_uri {:?} in client secret", secret.auth_uri))
}

fn wait_for_code(listener: &TcpListener, state: &str, cancel: &CancelToken) -> Result<String> {
    listener.set_nonblocking(true)?;
    loop {
        cancel.check()?;
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("Redirect connection from {}", peer);
                if let Some(code) = handle_redirect(stream, state)? {
                    return Ok(code);
                }
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(e).with_context(||"Redirect listener failed"),
        }
    }
}

fn browser_command(url: &str) -> Command {
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(&["/C", "start", ""]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut command = Command::new("xdg-open");
    command.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command
}

fn open_browser(url: &str) -> io::Result<()> {
    browser_command(url).spawn().map(|_| ())
}

// Anything that goes wrong with a single connection is that connection's problem.
// Only a denial or a forged redirect ends the flow.
fn handle_redirect(stream: TcpStream, state: &str) -> Result<Option<String>> {
    let request_line = match read_request(&stream) {
        Ok(line) => line,
        Err(e) => {
            debug!("Ignoring redirect connection: {}", e);
            return Ok(None);
        },
    };
    let outcome = parse_redirect(&request_line, state);
    let (status, body) = match &outcome {
        Ok(Some(_)) => ("200 OK", "The authentication flow has completed. You may close this window."),
        Ok(None) => ("404 Not Found", ""),
        Err(_) => ("400 Bad Request", "The authentication flow has failed."),
    };
    if let Err(e) = respond(&stream, status, body) {
        debug!("Unable to answer redirect connection: {}", e);
    }
    outcome
}

fn read_request(stream: &TcpStream) -> io::Result<String> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line)? == 0 {
        return Err(io::Error::new(ErrorKind::UnexpectedEof, "connection closed without a request"));
    }
    // Consume headers, closing with unread bytes resets the connection
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header.trim().is_empty() {
            break;
        }
    }
    Ok(request_line)
}

fn respond(mut stream: &TcpStream, status: &str, body: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status, body.len(), body,
    )?;
    stream.flush()
}

// "GET /?code=...&state=... HTTP/1.1". Ok(None) for anything that isn't a redirect for this request.
fn parse_redirect(request_line: &str, state: &str) -> Result<Option<String>> {
    let target = match request_line.split_whitespace().nth(1) {
        Some(target) => target,
        None => {
            debug!("Malformed request on redirect listener: {:?}", request_line.trim());
            return Ok(None);
        },
    };
    let url = match Url::parse(&format!("http://localhost{}", target)) {
        Ok(url) => url,
        Err(e) => {
            debug!("Malformed redirect target {:?}: {}", target, e);
            return Ok(None);
        },
    };
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let state_matches = params.get("state").map(String::as_str) == Some(state);
    if let Some(error) = params.get("error") {
        if !state_matches {
            warn!("Ignoring authorization error {:?} with unknown state", error);
            return Ok(None);
        }
        return Err(AuthError::Denied(error.clone()).into());
    }
    let code = match params.get("code") {
        Some(code) => code,
        None => return Ok(None),
    };
    if !state_matches {
        return Err(AuthError::StateMismatch.into());
    }
    Ok(Some(code.clone()))
}

fn exchange_code(secret: &ClientSecret, http: &Client, redirect_uri: &str, code: &str) -> Result<Credentials> {
    let response = token_request(http, &secret.token_uri, &[
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", secret.client_id.as_str()),
        ("client_secret", secret.client_secret.as_str()),
        ("redirect_uri", redirect_uri),
    ]).with_context(||"Unable to exchange authorization code")?;
    Ok(Credentials {
        token_expiry: response.expiry(Utc::now()),
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        token_uri: secret.token_uri.clone(),
        client_id: secret.client_id.clone(),
        client_secret: secret.client_secret.clone(),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        user_agent: Some(USER_AGENT.to_owned()),
        invalid: false,
    })
}

/// Swap the refresh token for a new access token.
///
/// A refresh the server rejects as `invalid_grant` leaves the credentials
/// marked invalid, so the caller can persist that and the next run authorizes
/// from scratch.
pub fn refresh(credentials: &mut Credentials, http: &Client) -> Result<()> {
    let refresh_token = match &credentials.refresh_token {
        Some(t) => t.clone(),
        None => {
            credentials.invalid = true;
            return Err(AuthError::NoRefreshToken.into());
        },
    };
    debug!("Refreshing access token");
    let refreshed = token_request(http, &credentials.token_uri, &[
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
    ]);
    match refreshed {
        Ok(response) => {
            credentials.token_expiry = response.expiry(Utc::now());
            credentials.access_token = response.access_token;
            if let Some(t) = response.refresh_token {
                credentials.refresh_token = Some(t);
            }
            Ok(())
        },
        Err(e) => {
            if let Some(AuthError::Rejected { error, .. }) = e.downcast_ref::<AuthError>() {
                if error == "invalid_grant" {
                    credentials.invalid = true;
                }
            }
            Err(e.context("Unable to refresh access token"))
        },
    }
}

fn token_request(http: &Client, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
    debug!("POST {}", token_uri);
    let response = http.post(token_uri).form(form).send()
        .with_context(|| format!("Unable to reach token endpoint {}", token_uri))?;
    let status = response.status();
    let body = response.text().with_context(||"Unable to read token endpoint response")?;
    if !status.is_success() {
        let rejected = match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(e) => AuthError::Rejected { error: e.error, description: e.error_description.unwrap_or_default() },
            Err(_) => AuthError::Rejected { error: status.to_string(), description: body.trim().to_owned() },
        };
        return Err(rejected.into());
    }
    serde_json::from_str(&body).with_context(||"Error de-serialising token response")
}
