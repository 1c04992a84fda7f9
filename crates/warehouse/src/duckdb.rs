//! Embedded DuckDB backend.
//!
//! Reads staged parquet from a local directory (or any path DuckDB can glob)
//! and runs the same load protocol as the remote warehouse. The connection is
//! synchronous, so every statement runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use duckdb::Connection;
use tracing::{debug, instrument};

use crate::client::Warehouse;
use crate::error::{Result, WarehouseError};
use crate::sql::Dialect;

#[derive(Clone)]
pub struct DuckDbWarehouse {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbWarehouse {
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a closure against the underlying connection on the current thread.
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&Connection) -> duckdb::Result<R>,
    ) -> Result<R> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| WarehouseError::Query("DuckDB connection lock poisoned".to_string()))?;
        Ok(f(&conn)?)
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    #[instrument(skip(self, sql))]
    async fn execute(&self, sql: &str) -> Result<()> {
        let this = self.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || this.with_connection(|conn| conn.execute_batch(&sql)))
            .await??;
        debug!("Statement executed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_and_read_back() {
        let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
        warehouse.execute("CREATE TABLE t (x INTEGER)").await.unwrap();
        warehouse.execute("INSERT INTO t VALUES (1), (2)").await.unwrap();

        let total: i64 = warehouse
            .with_connection(|conn| conn.query_row("SELECT SUM(x) FROM t", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_bad_sql_is_an_error() {
        let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
        let result = warehouse.execute("SELEKT 1").await;
        assert!(matches!(result, Err(WarehouseError::DuckDb(_))));
    }
}
