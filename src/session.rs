use std::path::PathBuf;
use anyhow::{Context, Result};
use chrono::Utc;
use log::*;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};

use crate::auth;
use crate::config::USER_AGENT;
use crate::model::storage::Credentials;
use crate::store;

pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .with_context(||"Unable to build HTTP client")
}

/// An HTTP client that signs every request with the current access token.
///
/// Expired tokens are refreshed before sending. A request that still comes
/// back 401 gets one refresh and one replay. Refreshed credentials are written
/// back to the token file.
pub struct Session {
    http: Client,
    credentials: Credentials,
    token_path: PathBuf,
}

impl Session {
    pub fn new(http: Client, credentials: Credentials, token_path: PathBuf) -> Self {
        Self { http, credentials, token_path }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn send<F>(&mut self, request: F) -> Result<Response>
        where F: Fn(&Client) -> RequestBuilder
    {
        if self.credentials.is_expired(Utc::now()) {
            debug!("Access token expired at {:?}", self.credentials.token_expiry);
            self.refresh()?;
        }
        let response = self.signed(&request)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        debug!("Request unauthorized, refreshing access token");
        self.refresh()?;
        self.signed(&request)
    }

    fn signed<F>(&self, request: &F) -> Result<Response>
        where F: Fn(&Client) -> RequestBuilder
    {
        let request = request(&self.http)
            .bearer_auth(&self.credentials.access_token)
            .build()
            .with_context(||"Unable to build request")?;
        debug!("{} {}", request.method(), request.url());
        self.http.execute(request).with_context(||"Request failed")
    }

    fn refresh(&mut self) -> Result<()> {
        let refreshed = auth::refresh(&mut self.credentials, &self.http);
        if refreshed.is_ok() || self.credentials.invalid {
            store::write_credentials(&self.token_path, &self.credentials)?;
        }
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;
    use crate::model::logical::TokenState;
    use crate::test_support::{credentials, serve};

    const FRESH: &str = r#"{"access_token": "new-access", "expires_in": 3600}"#;

    #[test]
    fn signs_requests_without_refresh_when_fresh() {
        let (base, server) = serve(vec![(200, "{}".to_owned())]);
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(http_client().unwrap(), credentials("http://unused/token"), dir.path().join("user_token.json"));
        let url = format!("{}/files", base);
        session.send(|http| http.get(&url)).unwrap();

        let requests = server.join().unwrap();
        assert_eq!(requests[0].header("authorization").as_deref(), Some("Bearer old-access"));
        assert_eq!(requests[0].header("user-agent").as_deref(), Some(USER_AGENT));
        assert!(!dir.path().join("user_token.json").exists());
    }

    #[test]
    fn refreshes_expired_token_first_and_persists() {
        let (base, server) = serve(vec![(200, FRESH.to_owned()), (200, "{}".to_owned())]);
        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("user_token.json");
        let mut expired = credentials(&format!("{}/token", base));
        expired.token_expiry = Some(Utc::now() - Duration::minutes(5));
        let mut session = Session::new(http_client().unwrap(), expired, token_path.clone());
        let url = format!("{}/files", base);
        session.send(|http| http.get(&url)).unwrap();

        let requests = server.join().unwrap();
        assert!(requests[0].request_line.starts_with("POST /token"));
        assert_eq!(requests[1].header("authorization").as_deref(), Some("Bearer new-access"));
        match store::read_credentials(&token_path).unwrap() {
            TokenState::Valid(c) => assert_eq!(c.access_token, "new-access"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unauthorized_is_refreshed_and_replayed_once() {
        let (base, server) = serve(vec![
            (401, "{}".to_owned()),
            (200, FRESH.to_owned()),
            (200, r#"{"ok": true}"#.to_owned()),
        ]);
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(http_client().unwrap(), credentials(&format!("{}/token", base)), dir.path().join("user_token.json"));
        let url = format!("{}/files", base);
        let response = session.send(|http| http.get(&url)).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(session.credentials().access_token, "new-access");

        let requests = server.join().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].header("authorization").as_deref(), Some("Bearer new-access"));
    }

    #[test]
    fn revoked_token_is_persisted_as_invalid() {
        let (base, server) = serve(vec![(400, r#"{"error": "invalid_grant"}"#.to_owned())]);
        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("user_token.json");
        let mut expired = credentials(&format!("{}/token", base));
        expired.token_expiry = Some(Utc::now() - Duration::minutes(5));
        let mut session = Session::new(http_client().unwrap(), expired, token_path.clone());
        assert!(session.send(|http| http.get("http://127.0.0.1:9/never")).is_err());
        server.join().unwrap();
        assert!(matches!(store::read_credentials(&token_path).unwrap(), TokenState::Invalid(_)));
    }
}
