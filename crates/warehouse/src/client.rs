//! Backend seam for executing warehouse statements.

use async_trait::async_trait;

use crate::error::Result;
use crate::sql::Dialect;

/// A SQL endpoint the loader can drive.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// SQL flavour this backend speaks.
    fn dialect(&self) -> Dialect;

    /// Execute one statement, discarding any result set.
    async fn execute(&self, sql: &str) -> Result<()>;
}
