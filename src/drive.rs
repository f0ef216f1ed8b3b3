use anyhow::{Context, Result};
use log::*;
use reqwest::StatusCode;
use reqwest::blocking::Response;
use thiserror::Error;

use crate::model::logical::Page;
use crate::model::remote::{ApiErrorResponse, FileList, TrashRequest};
use crate::session::Session;

pub const PAGE_SIZE: u32 = 1000;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPACE: &str = "photos";
const LIST_FIELDS: &str = "nextPageToken, files(id, name)";

/// Where photos are listed and trashed.
pub trait PhotoStore {
    /// Fetch one page of photos matching `query`, as-is. Filtering is the store's job.
    fn list(&mut self, query: &str, page_token: Option<&str>) -> Result<Page>;
    /// Set the trashed flag on one photo.
    fn trash(&mut self, id: &str) -> Result<()>;
}

#[derive(Debug, Error)]
#[error("Drive returned {status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub struct Drive {
    session: Session,
    files_url: String,
}

impl Drive {
    pub fn new(session: Session) -> Self {
        Self::with_files_url(session, FILES_URL)
    }

    pub fn with_files_url(session: Session, files_url: &str) -> Self {
        Self { session, files_url: files_url.trim_end_matches('/').to_owned() }
    }
}

impl PhotoStore for Drive {
    fn list(&mut self, query: &str, page_token: Option<&str>) -> Result<Page> {
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("q", query),
            ("spaces", SPACE),
            ("pageSize", page_size.as_str()),
            ("fields", LIST_FIELDS),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let url = &self.files_url;
        let response = self.session.send(|http| http.get(url).query(&params))?;
        let list: FileList = check(response)?.json()
            .with_context(||"Failed to de-serialise JSON file list")?;
        debug!("Listed {} file(s), next page {:?}", list.files.len(), list.next_page_token);
        Ok(list.into())
    }

    fn trash(&mut self, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.files_url, id);
        let response = self.session.send(|http| http.patch(&url).json(&TrashRequest { trashed: true }))?;
        check(response)?;
        Ok(())
    }
}

fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_owned());
    Err(ApiError { status, message }.into())
}
