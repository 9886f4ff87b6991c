//! Persisted publication ledger.
//!
//! One SQLite file per publication target, one row per product id. The row's
//! state is the sole source of truth for whether an id is safe to
//! (re)attempt. Any number of processes and threads may share the file;
//! correctness rests on SQLite transaction isolation, not on in-process
//! locking — [`Ledger::try_start`] opens an immediate write transaction so
//! the read-then-upsert sequence cannot interleave with a concurrent
//! caller.
//!
//! # Schema
//!
//! ```sql
//! posted_items(product_id TEXT PRIMARY KEY, status TEXT NOT NULL,
//!              wp_post_id INTEGER, created_at TEXT NOT NULL,
//!              error_message TEXT)
//! metadata(key TEXT PRIMARY KEY, value TEXT NOT NULL)
//! ```
//!
//! `created_at` is an ISO-8601 local timestamp string. TTL checks parse it
//! and compare absolute deltas; a timestamp that fails to parse counts as
//! still within TTL, so uncertain state blocks rather than double-posts.

use std::path::Path;

use chrono::{Duration, Local, NaiveDateTime};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection};

use crate::error::{PublisherError, Result};

const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Default staleness threshold for `processing` rows.
pub fn default_processing_ttl() -> Duration {
    Duration::hours(6)
}

/// Default retry window for `failed` rows.
pub fn default_failed_retry_window() -> Duration {
    Duration::hours(24)
}

/// Publication lifecycle state of one product id.
///
/// `Drafted` and `Published` are terminal for retry arbitration; `Failed`,
/// `DryRun`, and TTL-expired `Processing` are re-enterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// An attempt is in flight
    Processing,
    /// Published as a draft, not publicly live
    Drafted,
    /// Publicly live (or administratively confirmed live)
    Published,
    /// The last attempt errored
    Failed,
    /// Simulated attempt, no remote mutation performed
    DryRun,
}

impl LedgerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Drafted => "drafted",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::DryRun => "dry_run",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "processing" => Ok(Self::Processing),
            "drafted" => Ok(Self::Drafted),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            "dry_run" => Ok(Self::DryRun),
            other => Err(PublisherError::UnknownState(other.to_string())),
        }
    }

    /// Terminal states block further attempts indefinitely.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Drafted | Self::Published => true,
            Self::Processing | Self::Failed | Self::DryRun => false,
        }
    }
}

impl std::fmt::Display for LedgerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub product_id: String,
    pub state: LedgerState,
    pub remote_id: Option<i64>,
    pub created_at: String,
    pub error_detail: Option<String>,
}

/// Row counts by state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: i64,
    pub drafted: i64,
    pub published: i64,
    pub failed: i64,
    pub dry_run: i64,
}

/// SQLite-backed publication ledger, scoped to one publication target.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Open (creating if necessary) a ledger file.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PublisherError::storage)?;
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        Self::connect(&url, 5).await
    }

    /// Create an in-memory ledger (for testing).
    ///
    /// Capped at one connection: each in-memory SQLite connection is its
    /// own database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(PublisherError::storage)?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        Ok(ledger)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posted_items (
                product_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                wp_post_id INTEGER,
                created_at TEXT NOT NULL,
                error_message TEXT
            );

            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(PublisherError::storage)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn now_string() -> String {
        Local::now().naive_local().format(TIMESTAMP_FMT).to_string()
    }

    /// Whether `created_at` is younger than `window`. Unparseable
    /// timestamps count as fresh: when state is uncertain, block the
    /// retry rather than risk a double post.
    fn within_window(created_at: &str, window: Duration) -> bool {
        match NaiveDateTime::parse_from_str(created_at, TIMESTAMP_FMT) {
            Ok(t) => Local::now().naive_local().signed_duration_since(t) < window,
            Err(_) => true,
        }
    }

    /// Read-only check: is this id already posted, in flight, or inside
    /// its failed-retry window?
    pub async fn is_posted(
        &self,
        product_id: &str,
        processing_ttl: Duration,
        failed_retry_window: Duration,
    ) -> Result<bool> {
        let row = sqlx::query("SELECT status, created_at FROM posted_items WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PublisherError::storage)?;

        let Some(row) = row else {
            return Ok(false);
        };
        let status: String = row.get("status");
        let created_at: String = row.get("created_at");

        let blocked = match LedgerState::parse(&status)? {
            LedgerState::Drafted | LedgerState::Published => {
                tracing::debug!(product_id, "duplicate detected (already posted)");
                true
            }
            LedgerState::Processing => Self::within_window(&created_at, processing_ttl),
            LedgerState::Failed => Self::within_window(&created_at, failed_retry_window),
            LedgerState::DryRun => false,
        };
        Ok(blocked)
    }

    /// Atomically claim this id for a publication attempt.
    ///
    /// Exactly one concurrent caller per id receives `true` within the
    /// same TTL window. The read and the conditional upsert run inside a
    /// single `BEGIN IMMEDIATE` transaction so two callers cannot both
    /// observe "no entry".
    pub async fn try_start(&self, product_id: &str, processing_ttl: Duration) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(PublisherError::storage)?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(PublisherError::storage)?;

        let outcome = Self::try_start_locked(&mut conn, product_id, processing_ttl).await;

        match outcome {
            Ok(true) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(PublisherError::storage)?;
                tracing::info!(product_id, "publication attempt claimed");
                Ok(true)
            }
            other => {
                // Rollback is best-effort; dropping the connection aborts
                // the transaction anyway.
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                other
            }
        }
    }

    async fn try_start_locked(
        conn: &mut SqliteConnection,
        product_id: &str,
        processing_ttl: Duration,
    ) -> Result<bool> {
        let row = sqlx::query("SELECT status, created_at FROM posted_items WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(PublisherError::storage)?;

        if let Some(row) = row {
            let status: String = row.get("status");
            let created_at: String = row.get("created_at");
            match LedgerState::parse(&status)? {
                LedgerState::Drafted | LedgerState::Published => return Ok(false),
                LedgerState::Processing => {
                    if Self::within_window(&created_at, processing_ttl) {
                        return Ok(false);
                    }
                }
                LedgerState::Failed | LedgerState::DryRun => {}
            }
        }

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO posted_items
            (product_id, status, wp_post_id, created_at, error_message)
            VALUES (?, 'processing', NULL, ?, NULL)
            "#,
        )
        .bind(product_id)
        .bind(Self::now_string())
        .execute(&mut *conn)
        .await
        .map_err(PublisherError::storage)?;

        Ok(true)
    }

    /// Record a successful attempt. Idempotent upsert to the given state.
    pub async fn record_success(
        &self,
        product_id: &str,
        remote_id: Option<i64>,
        state: LedgerState,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO posted_items
            (product_id, status, wp_post_id, created_at, error_message)
            VALUES (?, ?, ?, ?, NULL)
            "#,
        )
        .bind(product_id)
        .bind(state.as_str())
        .bind(remote_id)
        .bind(Self::now_string())
        .execute(&self.pool)
        .await
        .map_err(PublisherError::storage)?;

        tracing::info!(product_id, state = %state, ?remote_id, "success recorded");
        Ok(())
    }

    /// Record a failed attempt with diagnostic detail.
    ///
    /// Terminal rows are left untouched: a late-arriving failure (e.g. a
    /// retry racing a reconciliation) must not downgrade a known-good
    /// record.
    pub async fn record_failure(&self, product_id: &str, detail: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posted_items
            (product_id, status, wp_post_id, created_at, error_message)
            VALUES (?, 'failed', NULL, ?, ?)
            ON CONFLICT(product_id) DO UPDATE SET
                status = CASE
                    WHEN posted_items.status IN ('drafted', 'published') THEN posted_items.status
                    ELSE excluded.status
                END,
                wp_post_id = CASE
                    WHEN posted_items.status IN ('drafted', 'published') THEN posted_items.wp_post_id
                    ELSE NULL
                END,
                created_at = CASE
                    WHEN posted_items.status IN ('drafted', 'published') THEN posted_items.created_at
                    ELSE excluded.created_at
                END,
                error_message = CASE
                    WHEN posted_items.status IN ('drafted', 'published') THEN posted_items.error_message
                    ELSE excluded.error_message
                END
            "#,
        )
        .bind(product_id)
        .bind(Self::now_string())
        .bind(detail)
        .execute(&self.pool)
        .await
        .map_err(PublisherError::storage)?;

        tracing::warn!(product_id, detail, "failure recorded");
        Ok(())
    }

    /// Batched reconciliation insert after scanning the remote store.
    ///
    /// Per-row merge: existing terminal rows keep their state, remote id,
    /// and timestamp; everything else takes the incoming values. The merge
    /// is commutative per row, so the operation is idempotent and safe to
    /// interleave with live `try_start` callers. Runs in one transaction.
    pub async fn bulk_mark_posted(
        &self,
        pairs: &[(String, Option<i64>)],
        state: LedgerState,
    ) -> Result<usize> {
        if pairs.is_empty() {
            return Ok(0);
        }

        let now = Self::now_string();
        let mut tx = self.pool.begin().await.map_err(PublisherError::storage)?;

        for (product_id, remote_id) in pairs {
            sqlx::query(
                r#"
                INSERT INTO posted_items
                (product_id, status, wp_post_id, created_at, error_message)
                VALUES (?, ?, ?, ?, NULL)
                ON CONFLICT(product_id) DO UPDATE SET
                    status = CASE
                        WHEN posted_items.status IN ('drafted', 'published') THEN posted_items.status
                        ELSE excluded.status
                    END,
                    wp_post_id = CASE
                        WHEN posted_items.wp_post_id IS NOT NULL THEN posted_items.wp_post_id
                        ELSE excluded.wp_post_id
                    END,
                    created_at = CASE
                        WHEN posted_items.status IN ('drafted', 'published') THEN posted_items.created_at
                        ELSE excluded.created_at
                    END,
                    error_message = NULL
                "#,
            )
            .bind(product_id)
            .bind(state.as_str())
            .bind(remote_id)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(PublisherError::storage)?;
        }

        tx.commit().await.map_err(PublisherError::storage)?;
        tracing::info!(count = pairs.len(), state = %state, "bulk reconciliation applied");
        Ok(pairs.len())
    }

    /// Delete all `failed` rows, restoring eligibility regardless of the
    /// retry window. Returns the number of rows cleared.
    pub async fn clear_failed(&self) -> Result<usize> {
        let result = sqlx::query("DELETE FROM posted_items WHERE status = 'failed'")
            .execute(&self.pool)
            .await
            .map_err(PublisherError::storage)?;

        let cleared = result.rows_affected() as usize;
        tracing::info!(cleared, "failed entries cleared");
        Ok(cleared)
    }

    /// Fetch one entry, if present.
    pub async fn get(&self, product_id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(
            "SELECT product_id, status, wp_post_id, created_at, error_message FROM posted_items WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(PublisherError::storage)?;

        match row {
            Some(row) => {
                let status: String = row.get("status");
                Ok(Some(LedgerEntry {
                    product_id: row.get("product_id"),
                    state: LedgerState::parse(&status)?,
                    remote_id: row.get("wp_post_id"),
                    created_at: row.get("created_at"),
                    error_detail: row.get("error_message"),
                }))
            }
            None => Ok(None),
        }
    }

    /// Row counts by state.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                SUM(CASE WHEN status = 'drafted' THEN 1 ELSE 0 END) as drafted,
                SUM(CASE WHEN status = 'published' THEN 1 ELSE 0 END) as published,
                SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) as failed,
                SUM(CASE WHEN status = 'dry_run' THEN 1 ELSE 0 END) as dry_run
            FROM posted_items
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(PublisherError::storage)?;

        Ok(LedgerStats {
            total: row.get::<Option<i64>, _>("total").unwrap_or(0),
            drafted: row.get::<Option<i64>, _>("drafted").unwrap_or(0),
            published: row.get::<Option<i64>, _>("published").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
            dry_run: row.get::<Option<i64>, _>("dry_run").unwrap_or(0),
        })
    }

    /// Read a value from the metadata table.
    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(PublisherError::storage)?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Write a value to the metadata table.
    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(PublisherError::storage)?;

        Ok(())
    }
}
