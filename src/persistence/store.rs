//! SQLite-based run history

use crate::persistence::{ExecutionStatus, HistoryBackend, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS runs (
        id TEXT PRIMARY KEY,
        pipeline_name TEXT NOT NULL,
        status TEXT NOT NULL,
        started_at TEXT NOT NULL,
        completed_at TEXT NOT NULL,
        steps_run INTEGER NOT NULL DEFAULT 0,
        failed_steps INTEGER NOT NULL DEFAULT 0,
        revisions INTEGER NOT NULL DEFAULT 0,
        prose_words INTEGER NOT NULL DEFAULT 0,
        error TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_runs_pipeline_name ON runs(pipeline_name)",
    "CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at)",
];

const COLUMNS: &str = "id, pipeline_name, status, started_at, completed_at, steps_run, \
                       failed_steps, revisions, prose_words, error";

/// SQLite history store
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Open (or create) a store; `:memory:` gives a private in-memory database
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))
            .with_context(|| format!("Invalid database path {}", db_path))?
            .create_if_missing(true);

        // Every in-memory connection is its own database, so keep just one
        let max_connections = if db_path == ":memory:" { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("prose-pipeline");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("Failed to create {}", db_dir.display()))?;

        let db_path = db_dir.join("history.db");
        let db_path = db_path
            .to_str()
            .with_context(|| format!("Database path is not UTF-8: {}", db_path.display()))?;
        Self::new(db_path).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize schema")?;
        }
        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    /// Convert NaiveDateTime to DateTime<Utc>
    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn parse_status(status: &str) -> ExecutionStatus {
        match status {
            "Ready" => ExecutionStatus::Ready,
            "Running" => ExecutionStatus::Running,
            "Completed" => ExecutionStatus::Completed,
            "Aborted" => ExecutionStatus::Aborted,
            _ => ExecutionStatus::Failed,
        }
    }

    fn from_row(row: &SqliteRow) -> Result<RunSummary> {
        Ok(RunSummary {
            execution_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            pipeline_name: row.get("pipeline_name"),
            status: Self::parse_status(&row.get::<String, _>("status")),
            started_at: Self::from_naive(row.get("started_at")),
            completed_at: Self::from_naive(row.get("completed_at")),
            steps_run: row.get::<i64, _>("steps_run") as usize,
            failed_steps: row.get::<i64, _>("failed_steps") as usize,
            revisions: row.get::<i64, _>("revisions") as u32,
            prose_words: row.get::<i64, _>("prose_words") as usize,
            error: row.get("error"),
        })
    }
}

#[async_trait::async_trait]
impl HistoryBackend for SqliteHistoryStore {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            COLUMNS
        ))
        .bind(run.execution_id.to_string())
        .bind(&run.pipeline_name)
        .bind(format!("{:?}", run.status))
        .bind(Self::to_naive(run.started_at))
        .bind(Self::to_naive(run.completed_at))
        .bind(run.steps_run as i64)
        .bind(run.failed_steps as i64)
        .bind(run.revisions as i64)
        .bind(run.prose_words as i64)
        .bind(&run.error)
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, execution_id: Uuid) -> Result<Option<RunSummary>> {
        let row = sqlx::query(&format!("SELECT {} FROM runs WHERE id = ?1", COLUMNS))
            .bind(execution_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load run")?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM runs ORDER BY started_at DESC LIMIT ?1",
            COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM runs WHERE pipeline_name = ?1 ORDER BY started_at DESC",
            COLUMNS
        ))
        .bind(pipeline_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT pipeline_name FROM runs ORDER BY pipeline_name ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list pipelines")?;

        Ok(rows.iter().map(|row| row.get("pipeline_name")).collect())
    }
}
