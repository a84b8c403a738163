//! Sequential push delivery to one or more Bark relays.
//!
//! # Design
//! `BarkService` holds a device key, a shared `Transport`, and an ordered
//! list of normalized relay base URLs. Each push is split into
//! `build_push_request` (produces an `HttpRequest`) and
//! `parse_push_response` (consumes an `HttpResponse`); `send` runs that pair
//! against every relay in registration order and stops at the first failure.

use std::sync::Arc;

use crate::config::BarkConfig;
use crate::context::SendContext;
use crate::error::BarkError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport, DEFAULT_TIMEOUT};
use crate::types::{Message, PushOptions};

/// Public relay used when no server is given.
pub const DEFAULT_SERVER_URL: &str = "https://api.day.app/";

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Canonical base URL for a relay.
///
/// Empty input maps to `DEFAULT_SERVER_URL`. Input that does not start with
/// `http` gets an `https://` prefix, and a missing trailing slash is added.
/// The result is not validated; a malformed URL only fails once a request
/// is attempted.
pub fn normalize_server_url(server: &str) -> String {
    if server.is_empty() {
        return DEFAULT_SERVER_URL.to_string();
    }

    let mut url = if server.starts_with("http") {
        server.to_string()
    } else {
        format!("https://{server}")
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Build the POST for one relay. `server` must already be normalized.
pub fn build_push_request(server: &str, message: &Message) -> Result<HttpRequest, BarkError> {
    let body = serde_json::to_string(message).map_err(|e| BarkError::Serialization(e.to_string()))?;
    Ok(HttpRequest {
        method: HttpMethod::Post,
        url: format!("{server}push"),
        headers: vec![("content-type".to_string(), CONTENT_TYPE.to_string())],
        body: Some(body),
    })
}

/// Only 200 counts as delivered. Anything else keeps the raw body.
pub fn parse_push_response(response: HttpResponse) -> Result<(), BarkError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(BarkError::Rejected {
        status: response.status,
        body: response.body,
    })
}

/// Client for one device across one or more relays.
///
/// Build it once and reuse it; it keeps no per-send state, so concurrent
/// `send` calls are fine. Register relays before sharing it.
#[derive(Clone)]
pub struct BarkService {
    device_key: String,
    transport: Arc<dyn Transport>,
    servers: Vec<String>,
}

impl std::fmt::Debug for BarkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarkService")
            .field("servers", &self.servers)
            .finish_non_exhaustive()
    }
}

impl BarkService {
    /// Service that delivers through the public default relay only.
    pub fn new(device_key: &str) -> Result<Self, BarkError> {
        Self::with_servers(device_key, std::iter::empty::<&str>())
    }

    /// Service for the given relays, or the default relay if none are given.
    pub fn with_servers<I, S>(device_key: &str, servers: I) -> Result<Self, BarkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT)?;
        Ok(Self::with_transport(device_key, servers, Arc::new(transport)))
    }

    /// Like `with_servers`, over a caller-supplied transport.
    pub fn with_transport<I, S>(device_key: &str, servers: I, transport: Arc<dyn Transport>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut service = Self {
            device_key: device_key.to_string(),
            transport,
            servers: Vec::new(),
        };
        service.add_receivers(servers);
        if service.servers.is_empty() {
            service.servers.push(DEFAULT_SERVER_URL.to_string());
        }
        service
    }

    /// Service built from deserialized settings, after `BarkConfig::validate`.
    pub fn from_config(config: &BarkConfig) -> Result<Self, BarkError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::with_transport(
            &config.device_key,
            &config.servers,
            Arc::new(transport),
        ))
    }

    /// Append relays after the existing ones, normalizing each. Duplicates
    /// are kept, so a relay registered twice receives every push twice.
    pub fn add_receivers<I, S>(&mut self, servers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.servers
            .extend(servers.into_iter().map(|s| normalize_server_url(s.as_ref())));
    }

    pub fn device_key(&self) -> &str {
        &self.device_key
    }

    /// Relay base URLs in send order.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Push `subject`/`body` to every relay in order.
    ///
    /// `ctx` is checked before each relay; once it is done the loop returns
    /// `BarkError::Cancelled` without contacting the remaining relays. A
    /// request still in flight when `ctx` finishes is abandoned and reported
    /// as `Cancelled` for that relay. The first transport failure or non-200
    /// reply also ends the loop, wrapped in `BarkError::Server` naming that
    /// relay. Relays earlier in the list may already have delivered the push
    /// by then.
    pub async fn send(
        &self,
        ctx: &SendContext,
        subject: &str,
        body: &str,
        options: PushOptions,
    ) -> Result<(), BarkError> {
        let message = Message::new(&self.device_key, subject, body, options);

        for server in &self.servers {
            if let Some(reason) = ctx.err() {
                tracing::debug!(%reason, server = %server, "send stopped by context");
                return Err(BarkError::Cancelled(reason));
            }

            tracing::debug!(server = %server, "pushing to bark server");
            if let Err(e) = self.send_one(ctx, server, &message).await {
                tracing::warn!(server = %server, error = %e, "bark push failed");
                return Err(BarkError::at_server(server, e));
            }
        }

        Ok(())
    }

    async fn send_one(&self, ctx: &SendContext, server: &str, message: &Message) -> Result<(), BarkError> {
        let request = build_push_request(server, message)?;
        let response = tokio::select! {
            biased;
            reason = ctx.done() => return Err(BarkError::Cancelled(reason)),
            result = self.transport.execute(request) => result?,
        };
        parse_push_response(response)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::CancelReason;

    /// Records every request and replays scripted responses in order,
    /// answering 200 once the script runs out.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<VecDeque<HttpResponse>>,
    }

    impl RecordingTransport {
        fn scripted(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            })
        }

        fn urls(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|r| r.url.clone()).collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BarkError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.responses.lock().unwrap().pop_front().unwrap_or(HttpResponse {
                status: 200,
                body: r#"{"code":200,"message":"success"}"#.to_string(),
            }))
        }
    }

    fn ok() -> HttpResponse {
        HttpResponse {
            status: 200,
            body: String::new(),
        }
    }

    // --- normalize_server_url ---

    #[test]
    fn empty_server_is_default() {
        assert_eq!(normalize_server_url(""), DEFAULT_SERVER_URL);
    }

    #[test]
    fn missing_scheme_gets_https() {
        assert_eq!(normalize_server_url("bark.example.com"), "https://bark.example.com/");
    }

    #[test]
    fn existing_scheme_is_kept() {
        assert_eq!(normalize_server_url("http://127.0.0.1:8080"), "http://127.0.0.1:8080/");
        assert_eq!(normalize_server_url("https://bark.example.com/"), "https://bark.example.com/");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["", "bark.example.com", "http://a.b", "https://c.d/", "host:9000/path"] {
            let once = normalize_server_url(input);
            assert_eq!(normalize_server_url(&once), once, "{input}");
            assert!(once.ends_with('/') && !once.ends_with("//"), "{input}");
        }
    }

    // --- construction ---

    #[test]
    fn no_servers_means_default_server() {
        let service = BarkService::new("key").unwrap();
        assert_eq!(service.servers(), [DEFAULT_SERVER_URL]);
        assert_eq!(service.device_key(), "key");

        let service = BarkService::with_servers("key", Vec::<String>::new()).unwrap();
        assert_eq!(service.servers(), [DEFAULT_SERVER_URL]);
    }

    #[test]
    fn explicit_servers_are_normalized_in_order() {
        let service = BarkService::with_servers("key", ["b.example", "http://a.example/"]).unwrap();
        assert_eq!(service.servers(), ["https://b.example/", "http://a.example/"]);
    }

    #[test]
    fn add_receivers_appends_without_dedup() {
        let mut service = BarkService::with_servers("key", ["a.example"]).unwrap();
        service.add_receivers(["b.example", "a.example"]);
        service.add_receivers(["c.example"]);
        assert_eq!(
            service.servers(),
            [
                "https://a.example/",
                "https://b.example/",
                "https://a.example/",
                "https://c.example/",
            ]
        );
    }

    #[test]
    fn from_config_uses_configured_servers() {
        let mut config = BarkConfig::new("key");
        config.servers = vec!["relay.example".to_string()];
        let service = BarkService::from_config(&config).unwrap();
        assert_eq!(service.servers(), ["https://relay.example/"]);
    }

    // --- build / parse ---

    #[test]
    fn build_push_request_produces_correct_request() {
        let message = Message::new("key", "title", "", PushOptions::default());
        let req = build_push_request("https://a.example/", &message).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://a.example/push");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json; charset=utf-8".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["badge"], 1);
        assert_eq!(body["sound"], "shake.caf");
        assert!(body.get("body").is_none());
        assert!(body.get("icon").is_none());
        assert!(body.get("group").is_none());
        assert!(body.get("url").is_none());
    }

    #[test]
    fn parse_push_response_success() {
        assert!(parse_push_response(ok()).is_ok());
    }

    #[test]
    fn parse_push_response_rejection_keeps_body() {
        let err = parse_push_response(HttpResponse {
            status: 500,
            body: "server error".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, BarkError::Rejected { status: 500, ref body } if body == "server error"));
    }

    #[test]
    fn parse_push_response_treats_other_2xx_as_failure() {
        let err = parse_push_response(HttpResponse {
            status: 204,
            body: String::new(),
        })
        .unwrap_err();
        assert_eq!(err.status(), Some(204));
    }

    // --- send ---

    #[tokio::test]
    async fn send_visits_every_server_in_order() {
        let transport = RecordingTransport::scripted(Vec::new());
        let service = BarkService::with_transport("key", ["a.example", "b.example", "a.example"], transport.clone());

        service
            .send(&SendContext::background(), "title", "body", PushOptions::default())
            .await
            .unwrap();

        assert_eq!(
            transport.urls(),
            ["https://a.example/push", "https://b.example/push", "https://a.example/push"]
        );
    }

    #[tokio::test]
    async fn send_stops_at_first_rejection() {
        let transport = RecordingTransport::scripted(vec![
            HttpResponse {
                status: 500,
                body: "server error".to_string(),
            },
            ok(),
        ]);
        let service = BarkService::with_transport("key", ["a.example", "b.example"], transport.clone());

        let err = service
            .send(&SendContext::background(), "title", "", PushOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.server(), Some("https://a.example/"));
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("server error"));
        assert_eq!(transport.urls(), ["https://a.example/push"]);
    }

    #[tokio::test]
    async fn cancelled_context_sends_nothing() {
        let transport = RecordingTransport::scripted(Vec::new());
        let service = BarkService::with_transport("key", ["a.example"], transport.clone());
        let ctx = SendContext::background();
        ctx.cancel();

        let err = service
            .send(&ctx, "title", "", PushOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.cancel_reason(), Some(CancelReason::Cancelled));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn send_uses_resolved_options() {
        let transport = RecordingTransport::scripted(Vec::new());
        let service = BarkService::with_transport("key", ["a.example"], transport.clone());

        service
            .send(
                &SendContext::background(),
                "title",
                "content",
                PushOptions::default().with_badge(0).with_url("https://github.com/berbai/inform"),
            )
            .await
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        let body: serde_json::Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "device_key": "key",
                "title": "title",
                "body": "content",
                "sound": "shake.caf",
                "url": "https://github.com/berbai/inform",
            })
        );
    }

    /// Never answers, like a relay that accepted the connection and hung.
    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, BarkError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn cancel_abandons_in_flight_request() {
        let service = BarkService::with_transport("key", ["a.example", "b.example"], Arc::new(HangingTransport));
        let ctx = SendContext::background();
        let handle = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.cancel();
        });

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            service.send(&ctx, "title", "", PushOptions::default()),
        )
        .await
        .expect("send should return once the context is cancelled")
        .unwrap_err();

        assert_eq!(err.cancel_reason(), Some(CancelReason::Cancelled));
        assert_eq!(err.server(), Some("https://a.example/"));
    }

    #[tokio::test]
    async fn deadline_abandons_in_flight_request() {
        let service = BarkService::with_transport("key", ["a.example"], Arc::new(HangingTransport));
        let ctx = SendContext::with_timeout(std::time::Duration::from_millis(20));

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            service.send(&ctx, "title", "", PushOptions::default()),
        )
        .await
        .expect("send should return at the context deadline")
        .unwrap_err();

        assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));
    }

    /// In-memory sink for the fmt subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn send_logs_server_but_not_title() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = RecordingTransport::scripted(Vec::new());
        let service = BarkService::with_transport("key", ["a.example"], transport);
        service
            .send(&SendContext::background(), "secret-title", "secret-body", PushOptions::default())
            .await
            .unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("https://a.example/"), "{output}");
        assert!(!output.contains("secret-title"), "{output}");
        assert!(!output.contains("secret-body"), "{output}");
    }
}
