//! REST client for a remote comment API.
//!
//! | Call                | Request                           | Success             |
//! |---------------------|-----------------------------------|---------------------|
//! | fetch               | `GET {base}/comments`             | `{"comments": [..]}`|
//! | create              | `POST {base}/comments`            | the new `Comment`   |
//! | delete              | `DELETE {base}/comments/{id}`     | any 2xx             |
//! | resolve             | `PATCH {base}/comments/{id}/resolve`  | any 2xx         |
//! | reposition          | `PATCH {base}/comments/{id}/position` | any 2xx         |

use std::time::Duration;

use serde::Deserialize;

use crate::store::{CommentStore, StoreError};
use crate::types::{Comment, NewComment, PositionUpdate};

/// Default API root used by the demo comment server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

#[derive(Deserialize)]
struct CommentList {
    #[serde(default)]
    comments: Vec<Comment>,
}

/// Comment storage behind the REST API.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Builds a client for the API rooted at `base_url` (no trailing slash needed).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the underlying client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn comment_url(&self, id: &str, suffix: &str) -> String {
        self.url(&format!("/comments/{}{}", encode_segment(id), suffix))
    }
}

fn check(response: reqwest::Response, action: &'static str) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Status { action, status: status.as_u16() })
    }
}

/// Percent-encodes a path segment (RFC 3986 unreserved characters pass through).
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

impl CommentStore for HttpStore {
    async fn fetch_comments(&self) -> Result<Vec<Comment>, StoreError> {
        let response = self.client.get(self.url("/comments")).send().await?;
        let list: CommentList = check(response, "fetch")?.json().await?;
        Ok(list.comments)
    }

    async fn create_comment(&self, draft: NewComment) -> Result<Comment, StoreError> {
        let response = self.client.post(self.url("/comments")).json(&draft).send().await?;
        Ok(check(response, "create")?.json().await?)
    }

    async fn delete_comment(&self, id: &str) -> Result<(), StoreError> {
        let response = self.client.delete(self.comment_url(id, "")).send().await?;
        check(response, "delete").map(drop)
    }

    async fn resolve_comment(&self, id: &str) -> Result<(), StoreError> {
        let response = self.client.patch(self.comment_url(id, "/resolve")).send().await?;
        check(response, "resolve").map(drop)
    }

    async fn update_position(&self, id: &str, update: PositionUpdate) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.comment_url(id, "/position"))
            .json(&update)
            .send()
            .await?;
        check(response, "reposition").map(drop)
    }
}
