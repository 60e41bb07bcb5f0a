//! Fluent PostgREST query builder.

use std::collections::HashMap;

use serde_json::Value;

use super::client::{Method, Outcome, Request, Transport};
use crate::error::{Error, Result};

/// Root connection to a Supabase project.
///
/// Holds the base URL, the credential headers and the transport. Queries are
/// started with [`Connection::query`], which hands out an independent copy of
/// the headers so sibling queries never see each other's state.
pub struct Connection<T> {
    base_url: String,
    headers: HashMap<String, String>,
    transport: T,
}

impl<T: Transport> Connection<T> {
    /// Connect to `base_url`, authenticating every request with `api_key`.
    pub fn new(base_url: &str, api_key: &str, transport: T) -> Self {
        let mut headers = HashMap::new();
        headers.insert("apikey".to_string(), api_key.to_string());
        headers.insert("Authorization".to_string(), format!("Bearer {}", api_key));
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            transport,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a new query from the connection's base state.
    pub fn query(&self) -> QueryBuilder<'_, T> {
        QueryBuilder {
            transport: &self.transport,
            base_url: self.base_url.clone(),
            headers: self.headers.clone(),
            url: None,
            payload: None,
        }
    }
}

/// A single query in progress.
///
/// Every step consumes the builder and returns the derived state. Filter,
/// projection and ordering steps do nothing until `from` or `rpc` has set a
/// target URL.
pub struct QueryBuilder<'a, T> {
    transport: &'a T,
    base_url: String,
    headers: HashMap<String, String>,
    url: Option<String>,
    payload: Option<Value>,
}

impl<T> Clone for QueryBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport,
            base_url: self.base_url.clone(),
            headers: self.headers.clone(),
            url: self.url.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<'a, T: Transport> QueryBuilder<'a, T> {
    /// Target a table or view.
    pub fn from(mut self, resource: &str) -> Self {
        self.url = Some(format!("{}/rest/v1/{}", self.base_url, resource));
        self
    }

    /// Project the given comma-separated columns.
    pub fn select(self, columns: &str) -> Self {
        self.param(format!("select={}", columns))
    }

    /// Keep rows where `column` equals `value` (`column=eq.value`).
    pub fn eq(self, column: &str, value: &str) -> Self {
        self.param(format!("{}=eq.{}", column, value))
    }

    /// Sort by `column`, ascending or descending.
    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.param(format!("order={}.{}", column, direction))
    }

    /// Target a remote procedure, replacing any table and filter state.
    pub fn rpc(mut self, function: &str, payload: Value) -> Self {
        self.url = Some(format!("{}/rest/v1/rpc/{}", self.base_url, function));
        self.payload = Some(payload);
        self
    }

    fn param(mut self, param: String) -> Self {
        if let Some(url) = self.url.as_mut() {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(&param);
        }
        self
    }

    /// The URL assembled so far, if a target has been set.
    #[cfg(test)]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The RPC payload, if any.
    #[cfg(test)]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    #[cfg(test)]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Issue a GET and return the raw response body.
    pub async fn read(self) -> Result<Vec<u8>> {
        self.execute(Method::Get).await
    }

    /// Issue a POST with the stored payload and return the raw response body.
    pub async fn write(self) -> Result<Vec<u8>> {
        self.execute(Method::Post).await
    }

    async fn execute(self, method: Method) -> Result<Vec<u8>> {
        let url = self.url.ok_or(Error::MissingTarget)?;
        let body = match method {
            Method::Get => None,
            Method::Post => Some(self.payload.unwrap_or_else(|| Value::Object(Default::default()))),
        };

        let response = self
            .transport
            .send(Request {
                method,
                url: url.clone(),
                headers: self.headers,
                body,
            })
            .await?;

        Outcome::classify(response).into_result(&url)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::testing::{block_on, FakeTransport};
    use crate::api::RawResponse;

    const BASE: &str = "https://demo.supabase.co";

    fn connection() -> Connection<FakeTransport> {
        Connection::new(
            "https://demo.supabase.co/",
            "anon-key",
            FakeTransport::new(|_| RawResponse::new(200, "[]")),
        )
    }

    #[test]
    fn test_from_select_eq_order_builds_query_string() {
        let conn = connection();
        let query = conn
            .query()
            .from("x")
            .select("a,b")
            .eq("c", "1")
            .order("d", true);

        let url = query.url().unwrap();
        assert_eq!(url, format!("{}/rest/v1/x?select=a,b&c=eq.1&order=d.asc", BASE));
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn test_order_descending() {
        let conn = connection();
        let query = conn.query().from("x").order("d", false);
        assert_eq!(query.url().unwrap(), format!("{}/rest/v1/x?order=d.desc", BASE));
    }

    #[test]
    fn test_filters_before_target_are_noops() {
        let conn = connection();
        let query = conn.query().select("a").eq("b", "1").order("c", true);
        assert_eq!(query.url(), None);

        let query = query.from("x");
        assert_eq!(query.url().unwrap(), format!("{}/rest/v1/x", BASE));
    }

    #[test]
    fn test_rpc_resets_url_and_stores_payload() {
        let conn = connection();
        let query = conn
            .query()
            .from("x")
            .select("a")
            .eq("b", "1")
            .rpc("f", json!({"query": "select 1"}));

        assert_eq!(query.url().unwrap(), format!("{}/rest/v1/rpc/f", BASE));
        assert_eq!(query.payload(), Some(&json!({"query": "select 1"})));
    }

    #[test]
    fn test_queries_from_same_connection_are_independent() {
        let conn = connection();
        let first = conn.query().from("a").select("x");
        let second = conn.query();
        let branch = first.clone().eq("y", "1");

        assert_eq!(second.url(), None);
        assert_eq!(first.url().unwrap(), format!("{}/rest/v1/a?select=x", BASE));
        assert_eq!(branch.url().unwrap(), format!("{}/rest/v1/a?select=x&y=eq.1", BASE));
        assert_eq!(second.headers().get("apikey").unwrap(), "anon-key");
        assert_eq!(
            second.headers().get("Authorization").unwrap(),
            "Bearer anon-key"
        );
    }

    #[test]
    fn test_read_without_target_fails() {
        let conn = connection();
        let err = block_on(conn.query().select("a").read()).unwrap_err();
        assert!(matches!(err, Error::MissingTarget));
        assert!(conn.transport().calls().is_empty());
    }

    #[test]
    fn test_read_issues_get_without_body() {
        let conn = connection();
        let body = block_on(conn.query().from("x").select("*").read()).unwrap();
        assert_eq!(body, b"[]");

        let calls = conn.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(calls[0].url, format!("{}/rest/v1/x?select=*", BASE));
        assert_eq!(calls[0].body, None);
    }

    #[test]
    fn test_write_posts_payload() {
        let conn = connection();
        block_on(conn.query().rpc("f", json!({"a": 1})).write()).unwrap();

        let calls = conn.transport().calls();
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_write_without_payload_posts_empty_object() {
        let conn = connection();
        block_on(conn.query().from("x").write()).unwrap();
        assert_eq!(conn.transport().calls()[0].body, Some(json!({})));
    }

    #[test]
    fn test_error_status_surfaces_as_transport_error() {
        let conn = Connection::new(
            BASE,
            "k",
            FakeTransport::new(|_| RawResponse::new(500, "boom")),
        );
        let err = block_on(conn.query().from("x").read()).unwrap_err();
        assert!(matches!(err, Error::Transport { status: 500, .. }));
    }
}
