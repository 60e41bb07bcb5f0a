//! In-memory transport for tests.

use std::future::Future;
use std::sync::Mutex;

use super::client::{RawResponse, Request, Transport};
use crate::error::Result;

type Responder = Box<dyn Fn(&Request) -> RawResponse + Send + Sync>;

/// Records every request and answers with a caller-supplied closure.
pub struct FakeTransport {
    responder: Responder,
    calls: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new(responder: impl Fn(&Request) -> RawResponse + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    /// SQL statements sent through `exec_sql`, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|call| call.url.ends_with("/rpc/exec_sql"))
            .filter_map(|call| call.body.as_ref()?.get("query")?.as_str().map(String::from))
            .collect()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: Request) -> Result<RawResponse> {
        let response = (self.responder)(&request);
        self.calls.lock().unwrap().push(request);
        Ok(response)
    }
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}
