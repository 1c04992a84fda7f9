//! Warehouse load protocol.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::client::Warehouse;
use crate::error::Result;
use crate::sql::{Identifier, StageCredentials};

/// Drives table creation, external binding and the insert for one table.
pub struct WarehouseLoader {
    warehouse: Arc<dyn Warehouse>,
    table: Identifier,
    external: Identifier,
    credentials: Option<StageCredentials>,
}

impl WarehouseLoader {
    /// Both names are validated here; nothing reaches SQL unchecked.
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        table: &str,
        external: &str,
        credentials: Option<StageCredentials>,
    ) -> Result<Self> {
        Ok(Self {
            warehouse,
            table: Identifier::parse(table)?,
            external: Identifier::parse(external)?,
            credentials,
        })
    }

    /// External reference name used when none is configured.
    pub fn default_external_name(table: &str) -> String {
        format!("ext_{}_staged", table)
    }

    pub fn table(&self) -> &Identifier {
        &self.table
    }

    pub fn external(&self) -> &Identifier {
        &self.external
    }

    /// Create the forecast table if it does not exist.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn ensure_table(&self) -> Result<()> {
        let sql = self.warehouse.dialect().create_table(&self.table);
        self.warehouse.execute(&sql).await?;
        info!("Forecast table ready");
        Ok(())
    }

    /// Point the external reference at `prefix_url`, replacing any previous binding.
    ///
    /// The previous binding is always dropped first; a failed drop is only
    /// logged. The create never reuses an existing reference, so a binding
    /// that survived the drop makes it fail. Returns `false` when the new
    /// binding cannot be created.
    #[instrument(skip(self), fields(external = %self.external))]
    pub async fn bind_external_stage(&self, prefix_url: &str) -> bool {
        let dialect = self.warehouse.dialect();

        if let Err(e) = self
            .warehouse
            .execute(&dialect.drop_external(&self.external))
            .await
        {
            warn!(error = %e, "Failed to drop previous external reference");
        }

        let ddl = dialect.create_external(&self.external, prefix_url, self.credentials.as_ref());
        match self.warehouse.execute(&ddl).await {
            Ok(()) => {
                info!(prefix = %prefix_url, "External reference bound");
                true
            }
            Err(e) => {
                error!(prefix = %prefix_url, error = %e, "Failed to create external reference");
                false
            }
        }
    }

    /// Append every staged row to the forecast table with derived columns.
    #[instrument(skip(self), fields(table = %self.table, external = %self.external))]
    pub async fn load_from_stage(&self) -> Result<()> {
        let sql = self
            .warehouse
            .dialect()
            .insert_from_external(&self.table, &self.external);
        self.warehouse.execute(&sql).await?;
        info!("Insert from external reference complete");
        Ok(())
    }

    /// Drop the external reference. Failures are logged, never raised.
    #[instrument(skip(self), fields(external = %self.external))]
    pub async fn release_external_stage(&self) {
        let sql = self.warehouse.dialect().drop_external(&self.external);
        match self.warehouse.execute(&sql).await {
            Ok(()) => info!("External reference dropped"),
            Err(e) => warn!(error = %e, "Failed to drop external reference"),
        }
    }
}
