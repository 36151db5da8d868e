//! Typed HTTP client layer driven by declarative endpoints.
//!
//! # Overview
//! Embedding code describes each API call as an `Endpoint` (base address plus
//! a `Descriptor` of method, path, parameters, body and credentials).
//! `Client` turns an endpoint into an `HttpRequest`, hands it to a pluggable
//! `Transport`, decodes the response into the caller's type and delivers
//! exactly one success or failure on the completion thread.
//!
//! # Design
//! - `Client` is stateless: a transport and a completion queue, nothing else.
//! - The transport is the only I/O seam. `UreqTransport` is bundled; tests
//!   swap in doubles.
//! - A response that fails to decode is retried as the backend's structured
//!   error type (`BackendError`) before the first decode error is reported.
//! - All failures share one closed `Error` enum.
//!
//! ```no_run
//! use retriever_core::{BackendError, Client, CompletionQueue, Descriptor, Endpoint, UreqTransport};
//! use serde::Deserialize;
//!
//! enum TicketApi {
//!     Tickets { venue: Option<String> },
//! }
//!
//! impl Endpoint for TicketApi {
//!     fn base_address(&self) -> &str {
//!         "https://tickets.example.com/v1"
//!     }
//!
//!     fn descriptor(&self) -> Descriptor {
//!         match self {
//!             TicketApi::Tickets { venue } => {
//!                 Descriptor::get("/tickets").with_parameter("venue", venue.clone())
//!             }
//!         }
//!     }
//! }
//!
//! #[derive(Deserialize)]
//! struct ApiError {
//!     reason: String,
//! }
//!
//! impl BackendError for ApiError {
//!     fn reason(&self) -> &str {
//!         &self.reason
//!     }
//! }
//!
//! #[derive(Deserialize)]
//! struct Ticket {
//!     name: String,
//! }
//!
//! let client: Client<TicketApi, ApiError> =
//!     Client::new(UreqTransport::new(), CompletionQueue::start().unwrap());
//! client.execute(
//!     &TicketApi::Tickets { venue: None },
//!     |tickets: Vec<Ticket>| println!("{} tickets", tickets.len()),
//!     |error| eprintln!("request failed: {error}"),
//! );
//! ```

pub mod client;
pub mod completion;
pub mod decode;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{build_request, Client};
pub use completion::CompletionQueue;
pub use decode::{decode_json, BackendError};
pub use descriptor::{Body, Credentials, Descriptor, Parameters};
pub use endpoint::{resolve_url, Endpoint};
pub use error::{BoxError, Error};
pub use http::{HttpMethod, HttpRequest};
pub use transport::{Completion, Transport, TransportOutcome, UreqTransport};
