//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations and interrupted-sync recovery automatically; no caller
    /// observes a record in `syncing` state from a previous process.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        database.recover().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        database.recover().await?;
        Ok(database)
    }

    /// Configure `SQLite` for durability and concurrency
    async fn configure(&self) -> Result<()> {
        // WAL keeps status updates atomic across crashes while allowing
        // concurrent readers; NORMAL sync is sufficient under WAL.
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok(); // In-memory databases reject WAL
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Reset records interrupted mid-sync by a crash.
    ///
    /// A `syncing` status found at startup belongs to an attempt whose
    /// outcome was lost; the record must be re-attempted from `pending`.
    async fn recover(&self) -> Result<()> {
        let recovered = self
            .conn
            .execute(
                "UPDATE records SET sync_status = 'pending' WHERE sync_status = 'syncing'",
                (),
            )
            .await?;

        if recovered > 0 {
            tracing::warn!(
                count = recovered,
                "Reset interrupted syncing records to pending"
            );
        }
        Ok(())
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reopen_resets_syncing_to_pending() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("courier.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO records (id, title, body, created_at, sync_status)
                     VALUES ('r1', 'Title', 'Body', 1, 'syncing')",
                    (),
                )
                .await
                .unwrap();
        }

        // Simulated crash: the database is reopened with a record stuck in
        // syncing, which recovery must reset before anything else runs.
        let db = Database::open(&db_path).await.unwrap();
        let mut rows = db
            .connection()
            .query("SELECT sync_status FROM records WHERE id = 'r1'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "pending");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reopen_preserves_content() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("courier.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO records (id, title, body, created_at)
                     VALUES ('r1', 'Keep me', 'Intact', 42)",
                    (),
                )
                .await
                .unwrap();
        }

        let db = Database::open(&db_path).await.unwrap();
        let mut rows = db
            .connection()
            .query(
                "SELECT title, body, created_at FROM records WHERE id = 'r1'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "Keep me");
        assert_eq!(row.get::<String>(1).unwrap(), "Intact");
        assert_eq!(row.get::<i64>(2).unwrap(), 42);
    }
}
