//! Error types for schema sync operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the transport, query builder and schema synchronizer.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration. Raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("table name cannot be empty")]
    EmptyTableName,

    /// Table names are interpolated into generated SQL, so only plain
    /// identifiers are accepted.
    #[error("invalid table name {0:?}: expected letters, digits and underscores")]
    InvalidTableName(String),

    /// A terminal operation was called before `from` or `rpc`.
    #[error("query has no target: call `from` or `rpc` first")]
    MissingTarget,

    /// The HTTP client could not be constructed (TLS backend, resolver).
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-2xx status.
    #[error("API request failed: {status} - {body}")]
    Transport { url: String, status: u16, body: String },

    /// The requested resource does not exist on the remote side.
    #[error("resource not found at {url}: {detail}")]
    NotFound { url: String, detail: String },

    #[error("failed to parse {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A source file that is not valid Rust.
    #[error("failed to parse {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("struct {struct_name} not found in {}", path.display())]
    DeclarationNotFound { struct_name: String, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with operation context.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
