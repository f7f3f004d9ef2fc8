/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema: one row per pinned comment.
///
/// Comments are scoped by `page_url` so one database can serve several pages.
/// `selector` holds the locator string; percentages are constrained to 0..=100
/// so a bad write fails loudly instead of producing an off-element pin.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS comments (
        id              TEXT    PRIMARY KEY,
        page_url        TEXT    NOT NULL,
        selector        TEXT    NOT NULL,
        x_percentage    REAL    NOT NULL CHECK(x_percentage BETWEEN 0 AND 100),
        y_percentage    REAL    NOT NULL CHECK(y_percentage BETWEEN 0 AND 100),
        content         TEXT    NOT NULL,
        author_id       TEXT    NOT NULL,
        author_name     TEXT    NOT NULL,
        author_avatar   TEXT    NOT NULL DEFAULT '',
        created_at      TEXT    NOT NULL,
        resolved        INTEGER NOT NULL DEFAULT 0 CHECK(resolved IN (0, 1)),
        viewport_width  REAL,
        viewport_height REAL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS comments_by_page ON comments(page_url, created_at);
";

/// DDL for the v2 schema: reply threads under a comment.
///
/// Replies are written by other tools; the overlay only reads them.
pub const SCHEMA_V2_SQL: &str = "
    CREATE TABLE IF NOT EXISTS replies (
        id            TEXT    PRIMARY KEY,
        comment_id    TEXT    NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
        content       TEXT    NOT NULL,
        author_id     TEXT    NOT NULL,
        author_name   TEXT    NOT NULL,
        author_avatar TEXT    NOT NULL DEFAULT '',
        created_at    TEXT    NOT NULL
    ) STRICT;

    CREATE INDEX IF NOT EXISTS replies_by_comment ON replies(comment_id, created_at);
";

/// Runs forward-only schema migration to bring the DB to the latest version.
///
/// Idempotent: safe to call on every startup. Each step runs inside its own
/// `BEGIN IMMEDIATE` transaction together with its `schema_version` row, so a
/// crash mid-migration leaves the previous version intact.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    for (target, ddl) in [(1, SCHEMA_V1_SQL), (2, SCHEMA_V2_SQL)] {
        if version < target {
            let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            tx.execute_batch(ddl)?;
            tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [target])?;
            tx.commit()?;
        }
    }

    Ok(())
}

/// Latest schema version written by [`migrate`].
pub const LATEST_VERSION: i64 = 2;
