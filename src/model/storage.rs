use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Deserialize};

// Refresh a little early so a token doesn't expire in flight
const EXPIRY_SKEW_SECONDS: i64 = 60;

// user_token.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<DateTime<Utc>>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub invalid: bool,
}

impl Credentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.token_expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECONDS) >= expiry,
            None => false,
        }
    }
}

// client_secret.json, as downloaded from the cloud console
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientSecretFile {
    Installed(ClientSecret),
    Web(ClientSecret),
}

impl ClientSecretFile {
    pub fn into_secret(self) -> ClientSecret {
        match self {
            ClientSecretFile::Installed(s) => s,
            ClientSecretFile::Web(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}
