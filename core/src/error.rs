//! Error types for the Bark push client.
//!
//! # Design
//! A non-200 reply gets its own `Rejected` variant carrying the raw status
//! and body, since that is what callers inspect when a relay refuses a push.
//! Network failures keep the underlying error as their `source` and are
//! classified by `TransportErrorKind`, so a timeout can be told apart from
//! a refused connection without string matching. Failures raised while
//! talking to a particular relay are wrapped in `Server`, whose message
//! embeds the inner one and names the endpoint that broke the loop.

use std::fmt;

use thiserror::Error;

/// Why a `SendContext` stopped a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `SendContext::cancel` was called.
    Cancelled,
    /// The context deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "context canceled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

/// Coarse class of a network-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The transport timeout elapsed.
    Timeout,
    /// The relay could not be reached: DNS, refused or reset connection.
    Connect,
    /// The response body could not be read.
    Body,
    /// Anything else, including a URL the transport could not parse.
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timed out"),
            TransportErrorKind::Connect => write!(f, "connection failed"),
            TransportErrorKind::Body => write!(f, "reading body failed"),
            TransportErrorKind::Request => write!(f, "request failed"),
        }
    }
}

/// Errors returned by `BarkService` and its transport.
#[derive(Debug, Error)]
pub enum BarkError {
    /// The HTTP transport could not be built or is otherwise unusable.
    #[error("transport not configured: {0}")]
    Configuration(String),

    /// The push payload could not be serialized to JSON.
    #[error("marshal message: {0}")]
    Serialization(String),

    /// Failure below HTTP. `source` is the transport's own error.
    #[error("{stage}: {kind}")]
    Transport {
        stage: &'static str,
        kind: TransportErrorKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The relay answered with something other than 200.
    #[error("bark returned status code {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The caller's context was done before or while a relay was contacted.
    #[error("{0}")]
    Cancelled(CancelReason),

    /// A failure while delivering to one specific relay.
    #[error("failed to send message to bark server {server:?}: {error}")]
    Server { server: String, error: Box<BarkError> },
}

impl BarkError {
    pub(crate) fn at_server(server: &str, error: BarkError) -> Self {
        BarkError::Server {
            server: server.to_string(),
            error: Box::new(error),
        }
    }

    pub fn transport(
        stage: &'static str,
        kind: TransportErrorKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BarkError::Transport {
            stage,
            kind,
            source: source.into(),
        }
    }

    /// Endpoint that failed, if the error came from a specific relay.
    pub fn server(&self) -> Option<&str> {
        match self {
            BarkError::Server { server, .. } => Some(server),
            _ => None,
        }
    }

    /// Status code of a rejected push, looking through the endpoint wrapper.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            BarkError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Cancellation reason, if the send was stopped by its context.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self.root() {
            BarkError::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Class of a network failure, looking through the endpoint wrapper.
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self.root() {
            BarkError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The innermost error, with any `Server` wrapper removed.
    pub fn root(&self) -> &BarkError {
        match self {
            BarkError::Server { error, .. } => error.root(),
            other => other,
        }
    }
}
