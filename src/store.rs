use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;
use anyhow::{Context, Result};
use log::*;

use crate::model::logical::TokenState;
use crate::model::storage::{ClientSecret, ClientSecretFile, Credentials};

fn read_if_found(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(&path) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into())
    }
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Error ensuring path {:?} exists", dir))
}

// A token file we can't parse is treated as missing and overwritten after the next authorization
pub fn read_credentials(path: &Path) -> Result<TokenState> {
    let content = read_if_found(path)
        .with_context(|| format!("Error reading token file {:?}", path))?;
    let credentials = content.and_then(|c| match serde_json::from_str::<Credentials>(&c) {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            warn!("Token file {:?} could not be loaded, will ignore and overwrite: {}", path, e);
            None
        },
    });
    Ok(credentials.into())
}

pub fn write_credentials(path: &Path, credentials: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let content = serde_json::to_string_pretty(credentials)?;
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)
        .with_context(|| format!("Error opening token file {:?} for writing", path))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Error writing token file {:?}", path))?;
    debug!("Saved credentials to {:?}", path);
    Ok(())
}

pub fn read_client_secret(path: &Path) -> Result<ClientSecret> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Client secret file {:?} is missing or unreadable", path))?;
    let file: ClientSecretFile = serde_json::from_str(&content)
        .with_context(|| format!("Client secret file {:?} is not a valid installed or web client", path))?;
    Ok(file.into_secret())
}
