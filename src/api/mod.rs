//! PostgREST transport and query builder.

mod client;
mod query;

#[cfg(test)]
pub mod testing;

pub use client::{HttpTransport, Transport};
pub use query::Connection;

#[cfg(test)]
pub use client::{Method, RawResponse, Request};
