// Host directory on SQLite: existence checks and master resolution.
// Hosts are seeded from config; mutation beyond that is out of scope.

use crate::error::StorageError;
use crate::models::{Host, HostStatus, MAX_PRIORITY, MIN_PRIORITY};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::instrument;

pub struct HostRepo {
    pool: SqlitePool,
}

impl HostRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hosts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                ip TEXT NOT NULL,
                priority INTEGER NOT NULL CHECK (priority BETWEEN 1 AND 100),
                status TEXT NOT NULL DEFAULT 'unknown',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_hosts_status_priority ON hosts(status, priority DESC)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a host record (config seeding).
    #[instrument(skip(self, host), fields(repo = "hosts", operation = "upsert", host_id = %host.id))]
    pub async fn upsert(&self, host: &Host) -> Result<(), StorageError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&host.priority) {
            return Err(StorageError::InvalidRecord(format!(
                "priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {}",
                host.priority
            )));
        }
        let now = chrono::Utc::now().timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO hosts (id, name, ip, priority, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                ip = excluded.ip,
                priority = excluded.priority,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&host.id)
        .bind(&host.name)
        .bind(&host.ip)
        .bind(host.priority)
        .bind(host.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "hosts", operation = "exists"))]
    pub async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM hosts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Host>, StorageError> {
        let row = sqlx::query("SELECT id, name, ip, priority, status FROM hosts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_host_row).transpose()
    }

    /// Online host with the highest priority; ties go to the smallest id.
    #[instrument(skip(self), fields(repo = "hosts", operation = "find_master"))]
    pub async fn find_master(&self) -> Result<Option<Host>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, ip, priority, status FROM hosts
             WHERE status = $1
             ORDER BY priority DESC, id ASC
             LIMIT 1",
        )
        .bind(HostStatus::Online.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(parse_host_row).transpose()
    }
}

fn parse_host_row(row: &SqliteRow) -> Result<Host, StorageError> {
    let status: String = row.try_get("status")?;
    Ok(Host {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        ip: row.try_get("ip")?,
        priority: row.try_get("priority")?,
        status: status.parse().map_err(StorageError::InvalidRecord)?,
    })
}
