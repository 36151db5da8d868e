//! The network seam.
//!
//! # Design
//! `Transport` is the only place bytes cross the network. It takes a fully
//! built `HttpRequest` and reports back exactly once through a boxed
//! `FnOnce`, from whatever thread it likes. Swapping in a test double means
//! implementing this one trait.
//!
//! `UreqTransport` runs a blocking `ureq` call on a short-lived worker
//! thread. Non-2xx statuses come back as data so that backend error bodies
//! reach the structured-error decoder. Response bodies are read without a
//! size cap unless one is set with `with_body_limit`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::BoxError;
use crate::http::{HttpMethod, HttpRequest};

/// What a transport reports when an exchange finishes.
///
/// Data without an error is a response. Anything else is a failure: an
/// error takes precedence over data, and neither present is an unknown
/// failure.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub data: Option<Vec<u8>>,
    pub error: Option<BoxError>,
}

impl TransportOutcome {
    pub fn data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Callback a transport invokes once per request.
pub type Completion = Box<dyn FnOnce(TransportOutcome) + Send + 'static>;

/// Performs the network exchange for a request.
///
/// Implementations must return without waiting for the response and must
/// invoke `completion` exactly once.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest, completion: Completion);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest, completion: Completion) {
        (**self).send(request, completion)
    }
}

/// Blocking `ureq` agent driven from a worker thread per request.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Abort exchanges that take longer than `timeout` end to end.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Fail exchanges whose response body exceeds `limit` bytes. Unset, the
    /// whole body is read.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    fn exchange(&self, request: HttpRequest) -> TransportOutcome {
        match self.call(request) {
            Ok(data) => TransportOutcome::data(data),
            Err(e) => TransportOutcome::failed(e),
        }
    }

    fn call(&self, request: HttpRequest) -> Result<Vec<u8>, ureq::Error> {
        let mut response = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match request.body {
                    Some(body) => builder.force_send_body().send(body.as_slice())?,
                    None => builder.call()?,
                }
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(request.url.as_str());
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match request.body {
                    Some(body) => builder.send(body.as_slice())?,
                    None => builder.send_empty()?,
                }
            }
        };
        response.body_mut().with_config().limit(self.body_limit).read_to_vec()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

type PendingExchange = Arc<Mutex<Option<(HttpRequest, Completion)>>>;

fn take_pending(pending: &PendingExchange) -> Option<(HttpRequest, Completion)> {
    pending.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest, completion: Completion) {
        // A failed spawn drops the closure, so the completion is parked in
        // a shared slot where the error path can still reach it.
        let pending: PendingExchange = Arc::new(Mutex::new(Some((request, completion))));
        let worker_pending = Arc::clone(&pending);
        let transport = self.clone();

        let spawned = thread::Builder::new()
            .name("retriever-transport".to_string())
            .spawn(move || {
                if let Some((request, completion)) = take_pending(&worker_pending) {
                    completion(transport.exchange(request));
                }
            });

        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not start transport worker");
            if let Some((_, completion)) = take_pending(&pending) {
                completion(TransportOutcome::failed(e));
            }
        }
    }
}
