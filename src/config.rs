use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

pub const APPLICATION_NAME: &str = "gphotos-archive";
pub const USER_AGENT: &str = "Google Photos Archive";
pub const DEFAULT_AUTH_PORTS: [u16; 2] = [8080, 8090];

const CREDENTIALS_PATH: &str = "~/.credentials";
const TOKEN_FILE: &str = "user_token.json";
const CLIENT_SECRET_FILE: &str = "client_secret.json";

/// How the authorization flow receives the code from the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOptions {
    pub local_webserver: bool,
    pub host: String,
    pub ports: Vec<u16>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            local_webserver: true,
            host: "localhost".to_owned(),
            ports: DEFAULT_AUTH_PORTS.to_vec(),
        }
    }
}

/// Everything a run needs, built once from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_dir: PathBuf,
    pub flow: FlowOptions,
    pub query: String,
    pub dry_run: bool,
}

impl Config {
    pub fn token_path(&self) -> PathBuf {
        self.app_dir.join(TOKEN_FILE)
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.app_dir.join(CLIENT_SECRET_FILE)
    }
}

// ~/.credentials/gphotos-archive
pub fn default_app_dir() -> Result<PathBuf> {
    let path = shellexpand::full(CREDENTIALS_PATH)
        .with_context(|| format!("Credentials path {} is invalid", CREDENTIALS_PATH))?;
    Ok(Path::new(path.as_ref()).join(APPLICATION_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_in_app_dir() {
        let config = Config {
            app_dir: PathBuf::from("/home/someone/.credentials/gphotos-archive"),
            flow: FlowOptions::default(),
            query: "modifiedTime < '2020-01-01T00:00:00'".to_owned(),
            dry_run: false,
        };
        assert_eq!(config.token_path(), PathBuf::from("/home/someone/.credentials/gphotos-archive/user_token.json"));
        assert_eq!(config.client_secret_path(), PathBuf::from("/home/someone/.credentials/gphotos-archive/client_secret.json"));
    }

    #[test]
    fn default_app_dir_ends_with_app_name() {
        let dir = default_app_dir().unwrap();
        assert!(dir.ends_with(".credentials/gphotos-archive"));
    }
}
