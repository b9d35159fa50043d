use crate::error::{AncestaError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::task;

/// Cache database connection manager.
pub struct CacheDb {
    path: std::path::PathBuf,
}

impl CacheDb {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open a connection with the pragmas the cache relies on.
    ///
    /// WAL for concurrent readers during write-back, NORMAL sync for speed,
    /// foreign keys on so relationship rows cannot outlive their endpoints.
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(AncestaError::Database)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA temp_store = MEMORY; \
             PRAGMA cache_size = -16384;",
        )?;
        Ok(conn)
    }

    /// Execute a closure with a connection on a blocking task.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path).map_err(AncestaError::Database)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL; \
                 PRAGMA synchronous = NORMAL; \
                 PRAGMA foreign_keys = ON; \
                 PRAGMA temp_store = MEMORY; \
                 PRAGMA cache_size = -16384;",
            )?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AncestaError::Source(format!("cache task join failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_with_connection_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cache.db");
        let db = CacheDb::new(&db_path);

        let result = db
            .with_connection(|conn| {
                conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", [])
                    .map_err(AncestaError::Database)?;
                Ok(())
            })
            .await;

        assert!(result.is_ok());
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_pragmas_set() {
        let temp_dir = TempDir::new().unwrap();
        let db = CacheDb::new(temp_dir.path().join("cache.db"));

        db.with_connection(|conn| {
            let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
            assert_eq!(journal_mode.to_uppercase(), "WAL");

            let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            assert_eq!(foreign_keys, 1);
            Ok(())
        })
        .await
        .unwrap();
    }
}
