//! Endpoints and URL resolution.
//!
//! # Design
//! An `Endpoint` is implemented by the embedding application, typically as an
//! enum with one variant per API call. It supplies a base address and a
//! `Descriptor`; the absolute URL is derived on demand and never cached.

use url::Url;

use crate::descriptor::{Descriptor, Parameters};
use crate::error::Error;

/// One logical API call.
pub trait Endpoint {
    /// Absolute base address, e.g. `https://api.example.com/v1`.
    fn base_address(&self) -> &str;

    /// Method, path, parameters, body and credentials for this call.
    fn descriptor(&self) -> Descriptor;

    /// Fully qualified request URL.
    fn url(&self) -> Result<Url, Error> {
        resolve_url(self.base_address(), &self.descriptor())
    }
}

/// Combine a base address with a descriptor's path and parameters.
///
/// The descriptor path is appended to the base path. A query embedded in the
/// path (`/search?x=1`) replaces the base query; declared parameters replace
/// both. Parameters are rendered in insertion order and a `None` value still
/// appears as `name=`.
pub fn resolve_url(base_address: &str, descriptor: &Descriptor) -> Result<Url, Error> {
    let mut url = Url::parse(base_address).map_err(|e| {
        tracing::warn!(base_address, error = %e, "base address is not a valid URL");
        Error::MalformedUrl
    })?;
    if url.cannot_be_a_base() {
        tracing::warn!(base_address, "base address cannot carry a path");
        return Err(Error::MalformedUrl);
    }

    let base_path = match url.path() {
        "/" => "",
        path => path,
    };
    let joined = format!("{base_path}{}", descriptor.path());
    let without_fragment = joined.split_once('#').map_or(joined.as_str(), |(before, _)| before);
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };
    url.set_path(path);
    url.set_query(query);

    if !descriptor.parameters().is_empty() {
        url.set_query(Some(&encode_query(descriptor.parameters())));
    }
    Ok(url)
}

fn encode_query(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value.unwrap_or(""))
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
