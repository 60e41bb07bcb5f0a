//! HTTP server exposing schema operations.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::Transport;
use crate::error::Error;
use crate::models::{ColumnSchema, TableSchemaResult};
use crate::schema::SchemaSync;

type SharedSync<T> = Arc<SchemaSync<T>>;

/// Bind `addr` and serve until the process is stopped.
pub async fn serve<T: Transport + 'static>(sync: SharedSync<T>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("schemasync listening on {}", addr);

    axum::serve(listener, router(sync)).await.context("Server error")
}

pub fn router<T: Transport + 'static>(sync: SharedSync<T>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schemas", get(list_schemas::<T>))
        .route("/schemas/{table}", get(pull_schema::<T>).post(push_schema::<T>))
        .route("/schemas/{table}/info", get(table_info::<T>))
        .layer(TraceLayer::new_for_http())
        .with_state(sync)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_schemas<T: Transport + 'static>(
    State(sync): State<SharedSync<T>>,
) -> Result<Json<Vec<TableSchemaResult>>, ApiError> {
    Ok(Json(sync.all_table_schemas().await?))
}

async fn pull_schema<T: Transport + 'static>(
    State(sync): State<SharedSync<T>>,
    Path(table): Path<String>,
) -> Result<Json<TableSchemaResult>, ApiError> {
    Ok(Json(sync.pull(&table).await?))
}

async fn table_info<T: Transport + 'static>(
    State(sync): State<SharedSync<T>>,
    Path(table): Path<String>,
) -> Result<Json<TableSchemaResult>, ApiError> {
    Ok(Json(sync.table_info(&table).await?))
}

async fn push_schema<T: Transport + 'static>(
    State(sync): State<SharedSync<T>>,
    Path(table): Path<String>,
    Json(columns): Json<Vec<ColumnSchema>>,
) -> Result<StatusCode, ApiError> {
    sync.push(&table, columns).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Error response wrapper.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self.0.root() {
            Error::EmptyTableName | Error::InvalidTableName(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Request { .. } | Error::Transport { .. } | Error::Decode { .. } => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
