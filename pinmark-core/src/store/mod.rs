//! The comment storage contract and its backends.
//!
//! The overlay never awaits storage itself. It emits [`StoreRequest`]s, a worker
//! runs them through [`execute`] against some [`CommentStore`], and the resulting
//! [`StoreOutcome`]s are fed back to the overlay. `execute` is the single place
//! where transport errors are logged and folded into failure outcomes, so no
//! storage error ever reaches an input handler.
//!
//! Backends:
//! - [`sqlite::SqliteStore`] — local WAL-mode SQLite file (tokio-rusqlite).
//! - [`http::HttpStore`] — the REST comment API (reqwest).

pub mod http;
pub mod schema;
pub mod sqlite;

use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

use crate::types::{Anchor, Comment, NewComment, PositionUpdate};

/// Why a storage call failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{action} returned HTTP {status}")]
    Status { action: &'static str, status: u16 },
    #[error("comment {0} not found")]
    NotFound(String),
}

/// Operations the overlay needs from comment storage.
///
/// All calls except `create_comment` are idempotent.
pub trait CommentStore: Send + Sync {
    /// All comments for the current page, oldest first.
    fn fetch_comments(&self) -> impl Future<Output = Result<Vec<Comment>, StoreError>> + Send;

    /// Persists a new comment. Storage assigns id, timestamp and author.
    fn create_comment(&self, draft: NewComment) -> impl Future<Output = Result<Comment, StoreError>> + Send;

    fn delete_comment(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn resolve_comment(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn update_position(
        &self,
        id: &str,
        update: PositionUpdate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A storage call requested by the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    Fetch,
    Create(NewComment),
    Delete { id: String },
    Resolve { id: String },
    /// Persist a drag. `previous` is the anchor before the optimistic update.
    UpdatePosition { id: String, update: PositionUpdate, previous: Anchor },
}

/// The result of a [`StoreRequest`], fed back to the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOutcome {
    /// `ok == false` means the fetch failed and `comments` is empty.
    Fetched { comments: Vec<Comment>, ok: bool },
    /// `None` when creation failed.
    Created(Option<Comment>),
    Deleted { id: String, ok: bool },
    Resolved { id: String, ok: bool },
    PositionUpdated { id: String, update: PositionUpdate, previous: Anchor, ok: bool },
}

/// Runs `request` against `store`, logging failures and never returning an error.
pub async fn execute<S: CommentStore>(store: &S, request: StoreRequest) -> StoreOutcome {
    match request {
        StoreRequest::Fetch => match store.fetch_comments().await {
            Ok(comments) => {
                info!(count = comments.len(), "fetched comments");
                StoreOutcome::Fetched { comments, ok: true }
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch comments");
                StoreOutcome::Fetched { comments: Vec::new(), ok: false }
            }
        },
        StoreRequest::Create(draft) => match store.create_comment(draft).await {
            Ok(comment) => {
                info!(id = %comment.id, "created comment");
                StoreOutcome::Created(Some(comment))
            }
            Err(e) => {
                warn!(error = %e, "failed to create comment");
                StoreOutcome::Created(None)
            }
        },
        StoreRequest::Delete { id } => {
            let ok = report(store.delete_comment(&id).await, "delete", &id);
            StoreOutcome::Deleted { id, ok }
        }
        StoreRequest::Resolve { id } => {
            let ok = report(store.resolve_comment(&id).await, "resolve", &id);
            StoreOutcome::Resolved { id, ok }
        }
        StoreRequest::UpdatePosition { id, update, previous } => {
            let ok = report(store.update_position(&id, update.clone()).await, "reposition", &id);
            StoreOutcome::PositionUpdated { id, update, previous, ok }
        }
    }
}

fn report(result: Result<(), StoreError>, action: &str, id: &str) -> bool {
    match result {
        Ok(()) => {
            info!(action, id, "comment updated");
            true
        }
        Err(e) => {
            warn!(action, id, error = %e, "comment update failed");
            false
        }
    }
}
