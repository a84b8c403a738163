use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// A push as received on `POST /push`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Push {
    pub device_key: String,
    pub title: String,
    pub body: Option<String>,
    pub badge: Option<u32>,
    pub sound: Option<String>,
    pub icon: Option<String>,
    pub group: Option<String>,
    pub url: Option<String>,
}

/// Fixed answer a relay gives to every push. `body: None` means the
/// standard success envelope.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<String>,
}

/// In-memory relay: records every accepted push and answers with `reply`.
#[derive(Clone, Debug)]
pub struct Relay {
    pushes: Arc<RwLock<Vec<Push>>>,
    reply: Arc<Reply>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self::with_reply(Reply {
            status: StatusCode::OK,
            body: None,
        })
    }

    /// Relay that answers every push with `status` and a plain-text `body`.
    pub fn replying(status: u16, body: impl Into<String>) -> Self {
        Self::with_reply(Reply {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: Some(body.into()),
        })
    }

    pub fn with_reply(reply: Reply) -> Self {
        Self {
            pushes: Arc::new(RwLock::new(Vec::new())),
            reply: Arc::new(reply),
        }
    }

    pub async fn pushes(&self) -> Vec<Push> {
        self.pushes.read().await.clone()
    }

    pub async fn push_count(&self) -> usize {
        self.pushes.read().await.len()
    }
}

pub fn app(relay: Relay) -> Router {
    Router::new().route("/push", post(push)).with_state(relay)
}

pub async fn run(listener: TcpListener, relay: Relay) -> Result<(), std::io::Error> {
    axum::serve(listener, app(relay)).await
}

async fn push(State(relay): State<Relay>, Json(input): Json<Push>) -> Response {
    tracing::info!(device_key = %input.device_key, title = %input.title, "push received");
    relay.pushes.write().await.push(input);

    let reply = relay.reply.as_ref();
    match &reply.body {
        Some(body) => (reply.status, body.clone()).into_response(),
        None => (reply.status, Json(success_envelope(reply.status))).into_response(),
    }
}

fn success_envelope(status: StatusCode) -> serde_json::Value {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    serde_json::json!({
        "code": status.as_u16(),
        "message": "success",
        "timestamp": timestamp,
    })
}
