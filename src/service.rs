//! Blocking facade over the async schema synchronizer.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::api::{Connection, HttpTransport};
use crate::config::Config;
use crate::models::{ColumnSchema, TableSchemaResult};
use crate::schema::SchemaSync;

/// Runs schema operations to completion on an owned runtime.
pub struct SchemaService {
    sync: Arc<SchemaSync<HttpTransport>>,
    runtime: Runtime,
}

impl SchemaService {
    /// Create a new SchemaService for the configured project.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new()?;
        let conn = Connection::new(&config.url, &config.api_key, transport);
        let runtime = Runtime::new().context("Failed to start async runtime")?;

        Ok(Self {
            sync: Arc::new(SchemaSync::new(conn)),
            runtime,
        })
    }

    pub fn pull(&self, table: &str) -> Result<TableSchemaResult> {
        let schema = self.runtime.block_on(self.sync.pull(table))?;
        tracing::info!(table = %schema.table_name, columns = schema.columns.len(), "table schema pulled");
        Ok(schema)
    }

    pub fn table_info(&self, table: &str) -> Result<TableSchemaResult> {
        Ok(self.runtime.block_on(self.sync.table_info(table))?)
    }

    pub fn pull_via_rpc(&self, table: &str) -> Result<TableSchemaResult> {
        Ok(self.runtime.block_on(self.sync.pull_via_rpc(table))?)
    }

    pub fn push(&self, table: &str, columns: Vec<ColumnSchema>) -> Result<()> {
        Ok(self.runtime.block_on(self.sync.push(table, columns))?)
    }

    pub fn all_table_schemas(&self, via_rpc: bool) -> Result<Vec<TableSchemaResult>> {
        let schemas = if via_rpc {
            self.runtime.block_on(self.sync.all_table_schemas_via_rpc())?
        } else {
            self.runtime.block_on(self.sync.all_table_schemas())?
        };
        tracing::info!(tables = schemas.len(), "table schemas pulled");
        Ok(schemas)
    }

    pub fn drop_view(&self, table: &str) -> Result<()> {
        Ok(self.runtime.block_on(self.sync.drop_view(table))?)
    }

    pub fn refresh_view(&self, table: &str) -> Result<()> {
        Ok(self.runtime.block_on(self.sync.refresh_view(table))?)
    }

    /// Serve the HTTP API until the process is stopped.
    pub fn serve(&self, addr: SocketAddr) -> Result<()> {
        let sync = self.sync.clone();
        self.runtime
            .block_on(async move { crate::server::serve(sync, addr).await })
    }
}
