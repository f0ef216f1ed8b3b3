use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Deserialize};

use crate::model::logical::{Page, Photo};

// Drive v3 files.list
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub files: Vec<File>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub name: String,
}

impl From<FileList> for Page {
    fn from(list: FileList) -> Self {
        Page {
            photos: list.files.into_iter().map(|f| Photo { id: f.id, name: f.name }).collect(),
            // Blank cursor means the same as none
            next_page: list.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

// Drive v3 files.update body. Only the trash flag is ever sent.
#[derive(Debug, Serialize)]
pub struct TrashRequest {
    pub trashed: bool,
}

// {"error": {"code": 400, "message": "Invalid Value"}}
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}

// OAuth2 token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|s| now + Duration::seconds(s))
    }
}

// {"error": "invalid_grant", "error_description": "Bad Request"}
#[derive(Debug, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_list_becomes_page() {
        let list: FileList = serde_json::from_str(r#"{
            "nextPageToken": "abc",
            "files": [{"id": "1", "name": "a.jpg"}, {"id": "2", "name": "b.jpg"}]
        }"#).unwrap();
        let page = Page::from(list);
        assert_eq!(page.next_page.as_deref(), Some("abc"));
        assert_eq!(page.photos, vec![
            Photo { id: "1".to_owned(), name: "a.jpg".to_owned() },
            Photo { id: "2".to_owned(), name: "b.jpg".to_owned() },
        ]);
    }

    #[test]
    fn missing_files_and_blank_cursor() {
        let page = Page::from(serde_json::from_str::<FileList>(r#"{"nextPageToken": ""}"#).unwrap());
        assert!(page.photos.is_empty());
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn trash_request_only_sets_flag() {
        let body = serde_json::to_value(&TrashRequest { trashed: true }).unwrap();
        assert_eq!(body, serde_json::json!({"trashed": true}));
    }

    #[test]
    fn token_expiry_from_expires_in() {
        let now = Utc::now();
        let response: TokenResponse = serde_json::from_str(r#"{"access_token": "t", "expires_in": 3599, "token_type": "Bearer"}"#).unwrap();
        assert_eq!(response.expiry(now), Some(now + Duration::seconds(3599)));
        assert_eq!(response.refresh_token, None);
    }
}
