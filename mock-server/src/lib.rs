//! Ticket service backend used to exercise `retriever-core` over real HTTP.
//!
//! Failures answer with `{"reason": "..."}` bodies so clients can exercise
//! their structured-error path.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, StatusCode,
    },
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const USERNAME: &str = "Golden";
pub const PASSWORD: &str = "Retreiver";
pub const BEARER_TOKEN: &str = "good-boy";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub venue: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTicket {
    pub title: String,
    #[serde(default)]
    pub venue: Option<String>,
}

#[derive(Deserialize)]
pub struct TicketFilter {
    pub venue: Option<String>,
}

/// Error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Failure {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
}

type Rejection = (StatusCode, Json<Failure>);

fn reject(status: StatusCode, reason: &str) -> Rejection {
    (
        status,
        Json(Failure {
            reason: reason.to_string(),
        }),
    )
}

pub type Db = Arc<RwLock<HashMap<Uuid, Ticket>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/{id}", get(get_ticket))
        .route("/basicAuthProtected", get(basic_auth_protected))
        .route("/me", get(bearer_protected))
        .route("/echo", get(echo_query))
        .route("/echo-body", get(echo_body))
        .route("/garbage", get(garbage))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_tickets(State(db): State<Db>, Query(filter): Query<TicketFilter>) -> Json<Vec<Ticket>> {
    let tickets = db.read().await;
    let venue = filter.venue.filter(|v| !v.is_empty());
    Json(
        tickets
            .values()
            .filter(|t| venue.is_none() || t.venue == venue)
            .cloned()
            .collect(),
    )
}

async fn create_ticket(
    State(db): State<Db>,
    Json(input): Json<CreateTicket>,
) -> Result<(StatusCode, Json<Ticket>), Rejection> {
    if input.title.trim().is_empty() {
        return Err(reject(StatusCode::UNPROCESSABLE_ENTITY, "title must not be empty"));
    }
    let ticket = Ticket {
        id: Uuid::new_v4(),
        title: input.title,
        venue: input.venue,
    };
    db.write().await.insert(ticket.id, ticket.clone());
    tracing::info!(id = %ticket.id, "ticket created");
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn get_ticket(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Ticket>, Rejection> {
    let tickets = db.read().await;
    tickets
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "ticket not found"))
}

async fn basic_auth_protected(headers: HeaderMap) -> Result<Json<Greeting>, Rejection> {
    let expected = format!("{USERNAME}:{PASSWORD}");
    let supplied = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok());
    match supplied {
        Some(decoded) if decoded == expected.as_bytes() => Ok(Json(Greeting {
            message: format!("hello {USERNAME}"),
        })),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "invalid credentials")),
    }
}

async fn bearer_protected(headers: HeaderMap) -> Result<Json<Greeting>, Rejection> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(BEARER_TOKEN) => Ok(Json(Greeting {
            message: "token accepted".to_string(),
        })),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "invalid token")),
    }
}

/// Echo the decoded query string back as ordered `[name, value]` pairs.
async fn echo_query(Query(pairs): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}

/// Echo the request body back with the request's content type.
async fn echo_body(headers: HeaderMap, body: Bytes) -> (HeaderMap, Bytes) {
    let mut reply = HeaderMap::new();
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        reply.insert(CONTENT_TYPE, content_type.clone());
    }
    (reply, body)
}

async fn garbage() -> &'static str {
    "random string"
}
