//! Table schema synchronization through per-table shadow views.
//!
//! Each table `T` gets a read-only view `public.T_schema` over
//! `information_schema.columns`, so its column metadata can be read through
//! the same PostgREST surface as ordinary data. Views are created on demand
//! through the `exec_sql` RPC function.

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::{Connection, Transport};
use crate::error::{Error, Result};
use crate::models::{ColumnSchema, RawColumn, TableName, TableSchemaResult};

const EXEC_SQL: &str = "exec_sql";
const INSERT_TABLE_SCHEMA: &str = "insert_table_schema";
const GET_TABLE_SCHEMA: &str = "get_table_schema";
const GET_ALL_TABLE_SCHEMAS: &str = "get_all_table_schemas";

const SCHEMA_COLUMNS: &str = "column_name,data_type,is_nullable,column_default";

/// Name of the shadow view for `table`.
pub fn shadow_view_name(table: &str) -> String {
    format!("{}_schema", table)
}

/// SQL that creates (or replaces) the shadow view and grants read access.
pub fn create_view_sql(table: &str) -> String {
    let view = shadow_view_name(table);
    format!(
        "CREATE OR REPLACE VIEW public.{view} AS
SELECT
    column_name,
    data_type,
    (is_nullable = 'YES')::boolean AS is_nullable,
    COALESCE(column_default, '') AS column_default
FROM information_schema.columns
WHERE table_schema = 'public'
  AND table_name = '{table}'
ORDER BY ordinal_position;

GRANT SELECT ON public.{view} TO anon, authenticated;",
        view = view,
        table = table.replace('\'', "''"),
    )
}

/// SQL that drops the shadow view and anything depending on it.
pub fn drop_view_sql(table: &str) -> String {
    format!("DROP VIEW IF EXISTS public.{} CASCADE;", shadow_view_name(table))
}

/// Table names end up inside generated SQL, so only plain identifiers pass.
fn validate_table_name(table: &str) -> Result<()> {
    if table.is_empty() {
        return Err(Error::EmptyTableName);
    }

    let mut chars = table.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidTableName(table.to_string()));
    }

    Ok(())
}

fn decode<T: DeserializeOwned>(body: &[u8], what: &'static str) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| Error::Decode { what, source })
}

/// Pulls and pushes table schemas against one Supabase project.
pub struct SchemaSync<T> {
    conn: Connection<T>,
}

impl<T: Transport> SchemaSync<T> {
    pub fn new(conn: Connection<T>) -> Self {
        Self { conn }
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    /// Fetch a table's columns, creating its shadow view first if needed.
    pub async fn pull(&self, table: &str) -> Result<TableSchemaResult> {
        validate_table_name(table)?;

        let exists = self
            .view_exists(table)
            .await
            .map_err(|e| e.wrap("failed to check schema view"))?;

        if !exists {
            tracing::debug!(table, "schema view missing, creating it");
            self.create_view(table)
                .await
                .map_err(|e| e.wrap("failed to create schema view"))?;
        }

        let columns = self
            .fetch_view(table)
            .await
            .map_err(|e| e.wrap("failed to get schema"))?;

        Ok(TableSchemaResult {
            table_name: table.to_string(),
            columns,
        })
    }

    /// Whether the shadow view for `table` can be queried.
    pub async fn view_exists(&self, table: &str) -> Result<bool> {
        let result = self
            .conn
            .query()
            .from(&shadow_view_name(table))
            .select(SCHEMA_COLUMNS)
            .read()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create or replace the shadow view. Safe to call repeatedly.
    pub async fn create_view(&self, table: &str) -> Result<()> {
        self.exec_sql(&create_view_sql(table))
            .await
            .map_err(|e| e.wrap("failed to create view via RPC"))
    }

    /// Drop the shadow view if it exists.
    pub async fn drop_view(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;

        self.exec_sql(&drop_view_sql(table))
            .await
            .map_err(|e| e.wrap("failed to drop view"))
    }

    /// Drop and recreate the shadow view.
    pub async fn refresh_view(&self, table: &str) -> Result<()> {
        self.drop_view(table).await?;
        self.create_view(table).await
    }

    async fn fetch_view(&self, table: &str) -> Result<Vec<ColumnSchema>> {
        let body = self
            .conn
            .query()
            .from(&shadow_view_name(table))
            .select("*")
            .read()
            .await?;

        decode(&body, "columns")
    }

    async fn exec_sql(&self, sql: &str) -> Result<()> {
        self.conn
            .query()
            .rpc(EXEC_SQL, json!({ "query": sql }))
            .write()
            .await?;
        Ok(())
    }

    /// Write a local column list as the table's schema.
    ///
    /// Recreates the shadow view so later pulls see the same table, then
    /// hands the columns to the `insert_table_schema` RPC function.
    pub async fn push(&self, table: &str, columns: Vec<ColumnSchema>) -> Result<()> {
        validate_table_name(table)?;

        self.create_view(table)
            .await
            .map_err(|e| e.wrap("failed to create schema view"))?;

        let schema = TableSchemaResult {
            table_name: table.to_string(),
            columns,
        };
        let payload = serde_json::to_value(&schema).map_err(|source| Error::Encode {
            what: "table schema",
            source,
        })?;

        self.conn
            .query()
            .rpc(INSERT_TABLE_SCHEMA, payload)
            .write()
            .await
            .map_err(|e| e.wrap("failed to insert table schema"))?;

        tracing::info!(table, columns = schema.columns.len(), "schema pushed");
        Ok(())
    }

    /// Schemas of every base table in the public schema, ordered by name.
    ///
    /// Tables whose schema cannot be fetched are logged and skipped.
    pub async fn all_table_schemas(&self) -> Result<Vec<TableSchemaResult>> {
        let body = self
            .conn
            .query()
            .from("information_schema.tables")
            .select("table_name")
            .eq("table_schema", "public")
            .eq("table_type", "BASE TABLE")
            .order("table_name", true)
            .read()
            .await
            .map_err(|e| e.wrap("failed to get table names"))?;

        let tables: Vec<TableName> = decode(&body, "table names")?;

        let mut results = Vec::with_capacity(tables.len());
        for table in tables {
            match self.pull(&table.table_name).await {
                Ok(schema) => results.push(schema),
                Err(e) => {
                    tracing::warn!(table = %table.table_name, error = %e, "failed to get table schema, skipping");
                }
            }
        }

        Ok(results)
    }

    /// Read a table's columns straight from `information_schema.columns`
    /// without creating a view.
    pub async fn table_info(&self, table: &str) -> Result<TableSchemaResult> {
        validate_table_name(table)?;

        let body = self
            .conn
            .query()
            .from("information_schema.columns")
            .select(SCHEMA_COLUMNS)
            .eq("table_schema", "public")
            .eq("table_name", table)
            .order("ordinal_position", true)
            .read()
            .await?;

        let raw: Vec<RawColumn> = decode(&body, "columns")?;

        Ok(TableSchemaResult {
            table_name: table.to_string(),
            columns: raw.into_iter().map(ColumnSchema::from).collect(),
        })
    }

    /// Fetch a schema through the `get_table_schema` RPC function.
    pub async fn pull_via_rpc(&self, table: &str) -> Result<TableSchemaResult> {
        if table.is_empty() {
            return Err(Error::EmptyTableName);
        }

        let body = self
            .conn
            .query()
            .rpc(GET_TABLE_SCHEMA, json!({ "p_table_name": table }))
            .write()
            .await?;

        decode(&body, "schema")
    }

    /// Fetch every schema through the `get_all_table_schemas` RPC function.
    pub async fn all_table_schemas_via_rpc(&self) -> Result<Vec<TableSchemaResult>> {
        let body = self
            .conn
            .query()
            .rpc(GET_ALL_TABLE_SCHEMAS, json!({}))
            .write()
            .await?;

        decode(&body, "schemas")
    }
}
