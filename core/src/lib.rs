//! Client for Bark push relays.
//!
//! # Overview
//! `BarkService` sends a titled push, with optional badge, sound, icon,
//! group and deep-link URL, to each configured relay by POSTing JSON to
//! `<server>push`. Relays are contacted one after another and the first
//! failure ends the send.
//!
//! # Design
//! - Relay URLs are normalized when registered, never at send time.
//! - Each push is split into `build_push_request` and `parse_push_response`
//!   around a `Transport`, so request shape and status handling can be
//!   tested without a network. `ReqwestTransport` is the default.
//! - Cancellation goes through `SendContext`. It is checked before each
//!   relay and also raced against the request in flight; the transport
//!   timeout bounds each request on its own.
//! - No retries, no batching, no parsing of the relay's reply beyond its
//!   status code.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod types;

pub use client::{build_push_request, normalize_server_url, parse_push_response, BarkService, DEFAULT_SERVER_URL};
pub use config::BarkConfig;
pub use context::SendContext;
pub use error::{BarkError, CancelReason, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, DEFAULT_TIMEOUT};
pub use types::{Message, PushOptions, DEFAULT_BADGE, DEFAULT_SOUND};
