use std::time::Duration;

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::info;

use crate::store::{CommentStore, StoreError};
use crate::types::{clamp_percentage, Author, Comment, NewComment, PositionUpdate, Reply, Viewport};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string) so
/// the setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await?;

    conn.call(|db| {
        crate::store::schema::migrate(db)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

/// Comment storage in a local SQLite file.
///
/// Plays the server's part of the storage contract: it assigns ids (UUID v4),
/// creation timestamps (RFC 3339) and the configured author to new comments.
/// All comments are scoped to one `page_url`.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
    page_url: String,
    author: Author,
}

impl SqliteStore {
    /// Opens the database at `path` and scopes the store to `page_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if [`open_db`] fails.
    pub async fn open(path: &str, page_url: &str, author: Author) -> Result<Self, StoreError> {
        let conn = open_db(path).await?;
        info!(path, page_url, "opened sqlite comment store");
        Ok(Self { conn, page_url: page_url.to_owned(), author })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Appends a reply to a comment's thread.
    ///
    /// The overlay never calls this; it exists for tools that answer feedback.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the comment does not exist.
    pub async fn add_reply(&self, comment_id: &str, content: &str, author: Author) -> Result<Reply, StoreError> {
        let reply = Reply {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_owned(),
            author,
            created_at: now_rfc3339(),
        };
        let row = reply.clone();
        let comment_id = comment_id.to_owned();
        let parent = comment_id.clone();

        let inserted = self
            .conn
            .call(move |db| {
                let exists = db
                    .query_row("SELECT 1 FROM comments WHERE id = ?1", [&comment_id], |_| Ok(()))
                    .optional()?
                    .is_some();
                if !exists {
                    return Ok(false);
                }
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO replies (id, comment_id, content, author_id, author_name, author_avatar, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        &row.id,
                        &comment_id,
                        &row.content,
                        &row.author.id,
                        &row.author.name,
                        &row.author.avatar,
                        &row.created_at
                    ],
                )?;
                tx.commit()?;
                Ok::<_, rusqlite::Error>(true)
            })
            .await?;

        if inserted {
            Ok(reply)
        } else {
            Err(StoreError::NotFound(parent))
        }
    }

    /// Runs a single-row write inside `BEGIN IMMEDIATE`; `NotFound` when no row changed.
    async fn write_one<P>(&self, id: &str, sql: &'static str, params: P) -> Result<(), StoreError>
    where
        P: rusqlite::Params + Send + 'static,
    {
        let changed = self
            .conn
            .call(move |db| {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                let changed = tx.execute(sql, params)?;
                tx.commit()?;
                Ok::<_, rusqlite::Error>(changed)
            })
            .await?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        Ok(())
    }
}

/// Returns the current time as an RFC 3339 string with millisecond precision.
fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn comment_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let width: Option<f64> = r.get(10)?;
    let height: Option<f64> = r.get(11)?;
    Ok(Comment {
        id: r.get(0)?,
        locator: r.get(1)?,
        x_percentage: r.get(2)?,
        y_percentage: r.get(3)?,
        content: r.get(4)?,
        author: Author { id: r.get(5)?, name: r.get(6)?, avatar: r.get(7)? },
        created_at: r.get(8)?,
        resolved: r.get(9)?,
        thread: Vec::new(),
        viewport: width.zip(height).map(|(width, height)| Viewport { width, height }),
    })
}

impl CommentStore for SqliteStore {
    async fn fetch_comments(&self) -> Result<Vec<Comment>, StoreError> {
        let page_url = self.page_url.clone();

        let comments = self
            .conn
            .call(move |db| {
                let mut stmt = db.prepare(
                    "SELECT id, selector, x_percentage, y_percentage, content,
                            author_id, author_name, author_avatar, created_at, resolved,
                            viewport_width, viewport_height
                     FROM comments
                     WHERE page_url = ?1
                     ORDER BY created_at, rowid",
                )?;
                let mut comments = stmt
                    .query_map([&page_url], comment_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut replies = db.prepare(
                    "SELECT id, content, author_id, author_name, author_avatar, created_at
                     FROM replies
                     WHERE comment_id = ?1
                     ORDER BY created_at, rowid",
                )?;
                for comment in &mut comments {
                    comment.thread = replies
                        .query_map([&comment.id], |r| {
                            Ok(Reply {
                                id: r.get(0)?,
                                content: r.get(1)?,
                                author: Author { id: r.get(2)?, name: r.get(3)?, avatar: r.get(4)? },
                                created_at: r.get(5)?,
                            })
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                }
                Ok::<_, rusqlite::Error>(comments)
            })
            .await?;
        Ok(comments)
    }

    async fn create_comment(&self, draft: NewComment) -> Result<Comment, StoreError> {
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            locator: draft.locator,
            x_percentage: clamp_percentage(draft.x_percentage),
            y_percentage: clamp_percentage(draft.y_percentage),
            content: draft.content,
            author: self.author.clone(),
            created_at: now_rfc3339(),
            resolved: false,
            thread: Vec::new(),
            viewport: Some(draft.viewport),
        };
        let row = comment.clone();
        let page_url = self.page_url.clone();

        self.conn
            .call(move |db| {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO comments (id, page_url, selector, x_percentage, y_percentage, content,
                                           author_id, author_name, author_avatar, created_at, resolved,
                                           viewport_width, viewport_height)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12)",
                    rusqlite::params![
                        &row.id,
                        &page_url,
                        &row.locator,
                        row.x_percentage,
                        row.y_percentage,
                        &row.content,
                        &row.author.id,
                        &row.author.name,
                        &row.author.avatar,
                        &row.created_at,
                        row.viewport.map(|v| v.width),
                        row.viewport.map(|v| v.height)
                    ],
                )?;
                tx.commit()?;
                Ok::<_, rusqlite::Error>(())
            })
            .await?;

        Ok(comment)
    }

    async fn delete_comment(&self, id: &str) -> Result<(), StoreError> {
        self.write_one(id, "DELETE FROM comments WHERE id = ?1", [id.to_owned()]).await
    }

    async fn resolve_comment(&self, id: &str) -> Result<(), StoreError> {
        self.write_one(id, "UPDATE comments SET resolved = 1 WHERE id = ?1", [id.to_owned()])
            .await
    }

    async fn update_position(&self, id: &str, update: PositionUpdate) -> Result<(), StoreError> {
        self.write_one(
            id,
            "UPDATE comments
             SET selector = ?2, x_percentage = ?3, y_percentage = ?4,
                 viewport_width = ?5, viewport_height = ?6
             WHERE id = ?1",
            (
                id.to_owned(),
                update.locator,
                clamp_percentage(update.x_percentage),
                clamp_percentage(update.y_percentage),
                update.viewport.width,
                update.viewport.height,
            ),
        )
        .await
    }
}
