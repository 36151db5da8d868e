//! End-to-end run against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every kind of call
//! through `Client` with the real `UreqTransport`. Response and error types
//! are declared here rather than imported from the server crate, so schema
//! drift between the two shows up as a failure.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use retriever_core::{
    BackendError, Client, CompletionQueue, Credentials, Descriptor, Endpoint, Error, UreqTransport,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Ticket {
    id: String,
    title: String,
    venue: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewTicket {
    title: String,
    venue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Greeting {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    reason: String,
}

impl BackendError for ServiceError {
    fn reason(&self) -> &str {
        &self.reason
    }
}

enum Call {
    ListTickets { venue: Option<String> },
    CreateTicket { title: String, venue: Option<String> },
    GetTicket { id: String },
    BasicAuthProtected { password: String },
    Me { token: String },
    Echo,
    EchoBody { title: String },
    Garbage,
}

struct TicketApi {
    base: String,
    call: Call,
}

impl Endpoint for TicketApi {
    fn base_address(&self) -> &str {
        &self.base
    }

    fn descriptor(&self) -> Descriptor {
        match &self.call {
            Call::ListTickets { venue } => Descriptor::get("/tickets").with_parameter("venue", venue.clone()),
            Call::CreateTicket { title, venue } => Descriptor::post("/tickets").with_json_body(NewTicket {
                title: title.clone(),
                venue: venue.clone(),
            }),
            Call::GetTicket { id } => Descriptor::get(format!("/tickets/{id}")),
            Call::BasicAuthProtected { password } => Descriptor::get("/basicAuthProtected")
                .with_credentials(Credentials::basic("Golden", password.clone())),
            Call::Me { token } => Descriptor::get("/me").with_credentials(Credentials::bearer(token.clone())),
            Call::Echo => Descriptor::get("/echo")
                .with_parameter("param1", None::<String>)
                .with_parameter("param2", Some("string with spaces"))
                .with_parameter("amp", Some("a&b")),
            Call::EchoBody { title } => Descriptor::get("/echo-body").with_json_body(NewTicket {
                title: title.clone(),
                venue: None,
            }),
            Call::Garbage => Descriptor::get("/garbage"),
        }
    }
}

/// Start the mock server on a random port and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

struct Harness {
    base: String,
    client: Client<TicketApi, ServiceError>,
}

impl Harness {
    fn new(base: String) -> Self {
        let transport = UreqTransport::with_timeout(Duration::from_secs(5));
        Self {
            base,
            client: Client::new(transport, CompletionQueue::start().unwrap()),
        }
    }

    /// Execute `call` and wait for its single delivery.
    fn fetch<T: DeserializeOwned + Send + 'static>(&self, call: Call) -> Result<T, Error> {
        let endpoint = TicketApi {
            base: self.base.clone(),
            call,
        };
        let (tx, rx) = mpsc::channel();
        let failure_tx = tx.clone();
        self.client.execute(
            &endpoint,
            move |value: T| tx.send(Ok(value)).unwrap(),
            move |error| failure_tx.send(Err(error)).unwrap(),
        );
        rx.recv_timeout(Duration::from_secs(10))
            .expect("no callback delivered")
    }
}

#[test]
fn ticket_service_lifecycle() {
    let addr = start_server();
    let api = Harness::new(format!("http://{addr}"));

    // Step 1: list with an absent venue, sent as `venue=`.
    let tickets: Vec<Ticket> = api.fetch(Call::ListTickets { venue: None }).unwrap();
    assert!(tickets.is_empty(), "expected empty list");

    // Step 2: create two tickets.
    let front: Ticket = api
        .fetch(Call::CreateTicket {
            title: "Front row".to_string(),
            venue: Some("Hall".to_string()),
        })
        .unwrap();
    assert_eq!(front.title, "Front row");
    assert_eq!(front.venue.as_deref(), Some("Hall"));

    let _balcony: Ticket = api
        .fetch(Call::CreateTicket {
            title: "Balcony".to_string(),
            venue: Some("Open Air".to_string()),
        })
        .unwrap();

    // Step 3: filter by a venue with a space in it.
    let open_air: Vec<Ticket> = api
        .fetch(Call::ListTickets {
            venue: Some("Open Air".to_string()),
        })
        .unwrap();
    assert_eq!(open_air.len(), 1);
    assert_eq!(open_air[0].title, "Balcony");

    // Step 4: fetch one by id.
    let fetched: Ticket = api.fetch(Call::GetTicket { id: front.id.clone() }).unwrap();
    assert_eq!(fetched, front);

    // Step 5: backend rejections surface their `reason`.
    let err = api
        .fetch::<Ticket>(Call::GetTicket {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
        })
        .unwrap_err();
    assert_eq!(err, Error::custom("ticket not found"));

    let err = api
        .fetch::<Ticket>(Call::CreateTicket {
            title: " ".to_string(),
            venue: None,
        })
        .unwrap_err();
    assert_eq!(err, Error::custom("title must not be empty"));
}

#[test]
fn credentials_are_sent() {
    let addr = start_server();
    let api = Harness::new(format!("http://{addr}"));

    let greeting: Greeting = api
        .fetch(Call::BasicAuthProtected {
            password: "Retreiver".to_string(),
        })
        .unwrap();
    assert_eq!(greeting.message, "hello Golden");

    let err = api
        .fetch::<Greeting>(Call::BasicAuthProtected {
            password: "Labrador".to_string(),
        })
        .unwrap_err();
    assert_eq!(err, Error::custom("invalid credentials"));

    let greeting: Greeting = api
        .fetch(Call::Me {
            token: "good-boy".to_string(),
        })
        .unwrap();
    assert_eq!(greeting.message, "token accepted");

    let err = api
        .fetch::<Greeting>(Call::Me {
            token: "bad-dog".to_string(),
        })
        .unwrap_err();
    assert_eq!(err, Error::custom("invalid token"));
}

#[test]
fn query_survives_the_round_trip() {
    let addr = start_server();
    let api = Harness::new(format!("http://{addr}"));

    let pairs: Vec<(String, String)> = api.fetch(Call::Echo).unwrap();
    assert_eq!(
        pairs,
        vec![
            ("param1".to_string(), String::new()),
            ("param2".to_string(), "string with spaces".to_string()),
            ("amp".to_string(), "a&b".to_string()),
        ]
    );
}

#[test]
fn get_with_json_body_reaches_the_server() {
    let addr = start_server();
    let api = Harness::new(format!("http://{addr}"));

    let echoed: serde_json::Value = api
        .fetch(Call::EchoBody {
            title: "Front row".to_string(),
        })
        .unwrap();
    assert_eq!(echoed, serde_json::json!({"title": "Front row", "venue": null}));
}

#[test]
fn undecodable_body_reports_decode_error() {
    let addr = start_server();
    let api = Harness::new(format!("http://{addr}"));

    let err = api.fetch::<Ticket>(Call::Garbage).unwrap_err();
    let expected = serde_json::from_slice::<Ticket>(b"random string")
        .unwrap_err()
        .to_string();
    assert_eq!(err, Error::custom(expected));
}

#[test]
fn unreachable_server_reports_transport_error() {
    // Bind then drop to get a port nothing is listening on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let api = Harness::new(format!("http://{addr}"));

    match api.fetch::<Ticket>(Call::Garbage) {
        Err(Error::Custom { reason }) => assert!(!reason.is_empty()),
        other => panic!("expected transport error, got {other:?}"),
    }
}
