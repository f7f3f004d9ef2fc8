//! Background task that owns the comment store for its lifetime.
//!
//! All communication is via channels: `StoreRequest` in, `AppEvent::Store` out.
//! Requests are executed one at a time in arrival order; `execute` folds every
//! failure into a failed outcome, so the loop itself never errors.

use pinmark_core::store::http::HttpStore;
use pinmark_core::store::sqlite::SqliteStore;
use pinmark_core::store::{execute, CommentStore, StoreError, StoreRequest};
use pinmark_core::types::{Comment, NewComment, PositionUpdate};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::event::AppEvent;

/// The configured storage backend.
pub enum Backend {
    Sqlite(SqliteStore),
    Http(HttpStore),
}

impl Backend {
    /// Opens the backend selected in `config`. The SQLite database's directory
    /// must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or the HTTP client
    /// cannot be built.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        match config.store.backend {
            BackendKind::Sqlite => {
                let author = config.author.clone().into();
                let store = SqliteStore::open(&config.store.path, &config.page_url, author).await?;
                Ok(Backend::Sqlite(store))
            }
            BackendKind::Http => {
                info!(base_url = %config.store.base_url, "using http comment store");
                Ok(Backend::Http(HttpStore::new(&config.store.base_url)?))
            }
        }
    }
}

impl CommentStore for Backend {
    async fn fetch_comments(&self) -> Result<Vec<Comment>, StoreError> {
        match self {
            Backend::Sqlite(store) => store.fetch_comments().await,
            Backend::Http(store) => store.fetch_comments().await,
        }
    }

    async fn create_comment(&self, draft: NewComment) -> Result<Comment, StoreError> {
        match self {
            Backend::Sqlite(store) => store.create_comment(draft).await,
            Backend::Http(store) => store.create_comment(draft).await,
        }
    }

    async fn delete_comment(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Backend::Sqlite(store) => store.delete_comment(id).await,
            Backend::Http(store) => store.delete_comment(id).await,
        }
    }

    async fn resolve_comment(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Backend::Sqlite(store) => store.resolve_comment(id).await,
            Backend::Http(store) => store.resolve_comment(id).await,
        }
    }

    async fn update_position(&self, id: &str, update: PositionUpdate) -> Result<(), StoreError> {
        match self {
            Backend::Sqlite(store) => store.update_position(id, update).await,
            Backend::Http(store) => store.update_position(id, update).await,
        }
    }
}

/// Spawns the store worker. It exits when either channel closes.
pub fn spawn_store_worker(
    backend: Backend,
    mut rx: UnboundedReceiver<StoreRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let outcome = execute(&backend, request).await;
            if event_tx.send(AppEvent::Store(outcome)).is_err() {
                break;
            }
        }
        info!("store worker stopped");
    });
}
