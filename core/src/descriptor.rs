//! Declarative description of a single API call.
//!
//! # Design
//! A `Descriptor` is assembled with consuming `with_*` builders and never
//! mutated afterwards. Endpoints produce a fresh one for every call, so
//! nothing derived from it (URL, body bytes, headers) is cached.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

use crate::http::HttpMethod;

/// Query parameters in insertion order. A `None` value is still sent, as
/// `name=`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, Option<String>)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter. An existing name keeps its position and takes the
    /// new value.
    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.insert(name, value.map(Into::into));
        }
        params
    }
}

/// Authentication scheme rendered into the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    BasicAuth { username: String, password: String },
    BearerToken(String),
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::BasicAuth {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::BearerToken(token.into())
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Credentials::BasicAuth { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
            Credentials::BearerToken(token) => format!("Bearer {token}"),
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::BearerToken(_) => f.debug_tuple("BearerToken").field(&"<redacted>").finish(),
        }
    }
}

/// Request payload.
///
/// `Json` holds any serializable value and is encoded when the request is
/// built, so a value that cannot be serialized fails the call with
/// `Error::Encoding` before the transport is touched. `Raw` bytes are sent
/// unchanged.
#[derive(Clone)]
pub enum Body {
    Json(Arc<dyn erased_serde::Serialize + Send + Sync>),
    Raw(Vec<u8>),
}

impl Body {
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Body::Json(Arc::new(value))
    }

    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Body::Raw(bytes.into())
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Json(_) => f.write_str("Json(..)"),
            Body::Raw(bytes) => write!(f, "Raw({} bytes)", bytes.len()),
        }
    }
}

/// Method, path, parameters, body and credentials for one logical call.
#[derive(Debug, Clone)]
pub struct Descriptor {
    method: HttpMethod,
    path: String,
    parameters: Parameters,
    body: Option<Body>,
    credentials: Option<Credentials>,
}

impl Descriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: Parameters::new(),
            body: None,
            credentials: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn with_parameter<V: Into<String>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.parameters.insert(name, value.map(Into::into));
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json_body<T>(self, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.with_body(Body::json(value))
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}
