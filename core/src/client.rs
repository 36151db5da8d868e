//! Request pipeline.
//!
//! # Design
//! `Client` holds only a transport and a completion queue and carries no
//! state between calls. `execute_with` resolves the endpoint, builds the
//! request, hands it to the transport, decodes whatever comes back and
//! delivers exactly one result. Every delivery, including failures detected
//! before the transport is called, goes through the completion queue.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::completion::CompletionQueue;
use crate::decode::{decode_json, decode_response, BackendError};
use crate::descriptor::{Body, Descriptor};
use crate::endpoint::{resolve_url, Endpoint};
use crate::error::{BoxError, Error};
use crate::http::HttpRequest;
use crate::transport::{Transport, TransportOutcome};

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Typed client for the endpoints `E` of a backend whose error payloads
/// decode as `B`.
pub struct Client<E, B> {
    transport: Arc<dyn Transport>,
    completion: CompletionQueue,
    _marker: PhantomData<fn(&E) -> B>,
}

impl<E, B> Clone for Client<E, B> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            completion: self.completion.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E, B> fmt::Debug for Client<E, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}

impl<E: Endpoint, B: BackendError> Client<E, B> {
    pub fn new(transport: impl Transport + 'static, completion: CompletionQueue) -> Self {
        Self {
            transport: Arc::new(transport),
            completion,
            _marker: PhantomData,
        }
    }

    /// Request `endpoint` and decode the JSON response as `T`.
    pub fn execute<T, S, F>(&self, endpoint: &E, on_success: S, on_failure: F)
    where
        T: DeserializeOwned + Send + 'static,
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(Error) + Send + 'static,
    {
        self.execute_with(endpoint, decode_json::<T>, on_success, on_failure)
    }

    /// Request `endpoint` and turn the raw response with `transform`.
    ///
    /// When `transform` fails the response is tried as `B`; a decoded
    /// backend error becomes `Error::Custom` with its reason, otherwise the
    /// transform's own error text is used.
    pub fn execute_with<T, X, S, F>(&self, endpoint: &E, transform: X, on_success: S, on_failure: F)
    where
        T: Send + 'static,
        X: FnOnce(&[u8]) -> Result<T, BoxError> + Send + 'static,
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(Error) + Send + 'static,
    {
        let request_id = Uuid::new_v4();
        let completion = self.completion.clone();
        let deliver = move |result: Result<T, Error>| {
            completion.dispatch(move || match result {
                Ok(value) => on_success(value),
                Err(error) => on_failure(error),
            })
        };

        let request = match self.prepare(endpoint) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(%request_id, %error, "request not sent");
                deliver(Err(error));
                return;
            }
        };

        tracing::debug!(%request_id, method = %request.method, url = %request.url, "dispatching request");
        self.transport.send(
            request,
            Box::new(move |outcome: TransportOutcome| {
                tracing::debug!(%request_id, "transport finished");
                deliver(settle::<T, B, X>(outcome, transform));
            }),
        );
    }

    /// Resolve `endpoint` into the request the transport would receive.
    pub fn prepare(&self, endpoint: &E) -> Result<HttpRequest, Error> {
        let descriptor = endpoint.descriptor();
        let url = resolve_url(endpoint.base_address(), &descriptor)?;
        build_request(url.as_str(), &descriptor)
    }
}

/// Build the transport-ready request for `descriptor` at `url`.
///
/// The body is encoded before credentials are applied; an encoding failure
/// aborts with `Error::Encoding`.
pub fn build_request(url: &str, descriptor: &Descriptor) -> Result<HttpRequest, Error> {
    let mut request = HttpRequest::new(descriptor.method(), url);
    if let Some(body) = descriptor.body() {
        encode_body(body, &mut request)?;
    }
    if let Some(credentials) = descriptor.credentials() {
        request.set_header(AUTHORIZATION, credentials.header_value());
    }
    Ok(request)
}

fn encode_body(body: &Body, request: &mut HttpRequest) -> Result<(), Error> {
    match body {
        Body::Json(value) => {
            let bytes = serde_json::to_vec(&**value).map_err(|e| {
                tracing::warn!(error = %e, "failed to serialize request body");
                Error::Encoding
            })?;
            request.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE);
            request.body = Some(bytes);
        }
        Body::Raw(bytes) => request.body = Some(bytes.clone()),
    }
    Ok(())
}

fn settle<T, B, X>(outcome: TransportOutcome, transform: X) -> Result<T, Error>
where
    B: BackendError,
    X: FnOnce(&[u8]) -> Result<T, BoxError>,
{
    match outcome {
        TransportOutcome {
            data: Some(data),
            error: None,
        } => decode_response::<T, B, X>(&data, transform),
        TransportOutcome { error: Some(error), .. } => Err(Error::custom(error.to_string())),
        TransportOutcome {
            data: None,
            error: None,
        } => Err(Error::Unknown),
    }
}
