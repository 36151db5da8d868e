//! Response decoding.
//!
//! A response is first run through the caller's transform. When that fails
//! the same bytes are tried as the backend's structured error type, and only
//! if that also fails is the transform's own failure reported.

use serde::de::DeserializeOwned;

use crate::error::{BoxError, Error};

/// Structured error payload a backend returns in place of a normal response.
pub trait BackendError: DeserializeOwned {
    fn reason(&self) -> &str;
}

/// Decode JSON bytes into `T`. This is the transform `Client::execute` uses.
pub fn decode_json<T: DeserializeOwned>(data: &[u8]) -> Result<T, BoxError> {
    Ok(serde_json::from_slice(data)?)
}

/// Map a failed transform to the error delivered to the caller.
///
/// A decodable backend error wins; otherwise the transform's failure is
/// reported as-is. The backend decode's own failure is never surfaced.
pub fn transform_failure<B: BackendError>(data: &[u8], cause: BoxError) -> Error {
    match serde_json::from_slice::<B>(data) {
        Ok(backend) => Error::custom(backend.reason()),
        Err(_) => Error::custom(cause.to_string()),
    }
}

/// Run `transform` over `data`, falling back to the backend error type.
pub fn decode_response<T, B, F>(data: &[u8], transform: F) -> Result<T, Error>
where
    B: BackendError,
    F: FnOnce(&[u8]) -> Result<T, BoxError>,
{
    transform(data).map_err(|cause| {
        tracing::warn!(error = %cause, "response transform failed, trying backend error payload");
        transform_failure::<B>(data, cause)
    })
}
