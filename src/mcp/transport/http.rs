// ABOUTME: Streamable HTTP transport for MCP communication.
// ABOUTME: One POST per message, sticky Mcp-Session-Id, JSON or single-event SSE bodies.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::Transport;
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// Per-client session state. Guarded by one lock so exchanges never overlap.
#[derive(Debug, Default)]
struct HttpSession {
    next_id: u64,
    session_id: Option<String>,
}

/// HTTP transport - simple request/response over HTTP.
///
/// MCP Streamable HTTP transport uses:
/// - POST with JSON-RPC request body
/// - JSON-RPC response in the body, either plain JSON or a `text/event-stream`
///   carrying the response as its first JSON `data:` line
/// - a server-issued `Mcp-Session-Id` that must be echoed once seen
pub struct HttpTransport {
    endpoint_url: String,
    headers: HashMap<String, String>,
    http_client: reqwest::Client,
    timeout: Duration,
    session: Mutex<HttpSession>,
}

impl HttpTransport {
    /// Connect to an HTTP MCP server.
    pub async fn connect(
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("conch/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        // Validate URL format
        let _parsed = reqwest::Url::parse(url)
            .map_err(|e| McpError::Connection(format!("Invalid URL: {}", e)))?;

        Ok(Self {
            endpoint_url: url.trim_end_matches('/').to_string(),
            headers: headers.clone(),
            http_client,
            timeout,
            session: Mutex::new(HttpSession {
                next_id: 1,
                session_id: None,
            }),
        })
    }

    /// Get the endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// The session id the server assigned, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.session.lock().await.session_id.clone()
    }

    /// POST one JSON-RPC message. Records any session id the server hands out.
    async fn post(&self, session: &mut HttpSession, json: String) -> Result<reqwest::Response, McpError> {
        let mut req_builder = self
            .http_client
            .post(&self.endpoint_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");

        for (name, value) in &self.headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        if let Some(session_id) = session.session_id.as_ref() {
            req_builder = req_builder.header(SESSION_HEADER, session_id.clone());
        }

        let response = req_builder.body(json).send().await.map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout(self.timeout)
            } else {
                McpError::Connection(format!("HTTP request failed: {}", e))
            }
        })?;

        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if session.session_id.as_deref() != Some(id) {
                debug!(session_id = id, "MCP server assigned session");
                session.session_id = Some(id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol(format!(
                "HTTP {} - {}",
                status.as_u16(),
                body
            )));
        }

        Ok(response)
    }
}

/// Decode a response body according to its declared content type.
///
/// Event streams are scanned for the first `data:` line holding valid JSON;
/// that line is taken as the whole response and anything after it is ignored.
pub(crate) fn parse_body(content_type: &str, body: &str) -> Result<McpResponse, McpError> {
    if content_type.contains("text/event-stream") {
        return body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .find_map(|data| serde_json::from_str::<McpResponse>(data).ok())
            .ok_or_else(|| McpError::Protocol("No JSON in SSE response".into()));
    }

    serde_json::from_str(body)
        .map_err(|e| McpError::Protocol(format!("Invalid JSON-RPC response: {}", e)))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<McpResponse, McpError> {
        let mut session = self.session.lock().await;

        let id = session.next_id;
        session.next_id += 1;

        let json = serde_json::to_string(&McpRequest::new(id, method, params))?;
        debug!(id, method, url = %self.endpoint_url, "-> http request");
        let response = self.post(&mut session, json).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout(self.timeout)
            } else {
                McpError::Protocol(format!("Failed to read response: {}", e))
            }
        })?;

        let mcp_response = parse_body(&content_type, &body)?;

        // Validate response ID matches request ID
        if mcp_response.id != Some(id) {
            return Err(McpError::Protocol(format!(
                "Response ID {:?} does not match request ID {}",
                mcp_response.id, id
            )));
        }

        Ok(mcp_response)
    }

    async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let mut session = self.session.lock().await;
        let json = serde_json::to_string(&McpNotification::new(method, params))?;
        self.post(&mut session, json).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        // Nothing to tear down: the only state is the session header.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Serve canned HTTP responses, one per connection, returning the raw requests.
    async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/mcp", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf).to_string();
                    if let Some(head_end) = text.find("\r\n\r\n") {
                        let content_length = text[..head_end]
                            .lines()
                            .find_map(|l| {
                                let lower = l.to_ascii_lowercase();
                                lower
                                    .strip_prefix("content-length:")
                                    .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                            })
                            .unwrap_or(0);
                        if buf.len() >= head_end + 4 + content_length {
                            break;
                        }
                    }
                }
                seen.push(String::from_utf8_lossy(&buf).to_string());
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            seen
        });

        (url, handle)
    }

    fn http_response(extra_headers: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            content_type,
            body.len(),
            extra_headers,
            body
        )
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let result = HttpTransport::connect("not-a-valid-url", &HashMap::new(), TIMEOUT).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_endpoint_url_trims_trailing_slash() {
        let transport = HttpTransport::connect("http://localhost:8080/mcp/", &HashMap::new(), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(transport.endpoint_url(), "http://localhost:8080/mcp");
    }

    #[test]
    fn test_parse_plain_json_body() {
        let resp = parse_body(
            "application/json",
            r#"{"jsonrpc":"2.0","id":3,"result":{"tools":[]}}"#,
        )
        .unwrap();
        assert_eq!(resp.id, Some(3));
    }

    #[test]
    fn test_parse_event_stream_takes_first_json_event() {
        let body = "event: message\n\
                    data: \n\
                    data: {not json\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"first\":true}}\n\
                    \n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"second\":true}}\n";

        let resp = parse_body("text/event-stream; charset=utf-8", body).unwrap();
        assert_eq!(resp.result.unwrap()["first"], true);
    }

    #[test]
    fn test_parse_event_stream_without_json_is_error() {
        let result = parse_body("text/event-stream", "event: ping\ndata: \n\n");
        assert!(matches!(result, Err(McpError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_session_id_is_sticky() {
        let (url, server) = serve(vec![
            http_response(
                "Mcp-Session-Id: abc-123\r\n",
                "application/json",
                r#"{"jsonrpc":"2.0","id":1,"result":{}}"#,
            ),
            http_response(
                "",
                "text/event-stream",
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}\n\n",
            ),
        ])
        .await;

        let mut headers = HashMap::new();
        headers.insert("X-Api-Key".to_string(), "secret".to_string());
        let transport = HttpTransport::connect(&url, &headers, TIMEOUT).await.unwrap();

        transport.request("initialize", None).await.unwrap();
        assert_eq!(transport.session_id().await.as_deref(), Some("abc-123"));

        let second = transport.request("tools/list", None).await.unwrap();
        assert_eq!(second.id, Some(2));

        let requests = server.await.unwrap();
        let first = requests[0].to_ascii_lowercase();
        let second = requests[1].to_ascii_lowercase();
        assert!(!first.contains("mcp-session-id"));
        assert!(first.contains("x-api-key: secret"));
        assert!(second.contains("mcp-session-id: abc-123"));
    }

    #[tokio::test]
    async fn test_error_status_is_protocol_error() {
        let (url, _server) = serve(vec![
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom"
                .to_string(),
        ])
        .await;

        let transport = HttpTransport::connect(&url, &HashMap::new(), TIMEOUT).await.unwrap();
        match transport.request("tools/list", None).await {
            Err(McpError::Protocol(msg)) => assert!(msg.contains("500")),
            other => panic!("Expected protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unanswered_request_is_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/mcp", listener.local_addr().unwrap());
        // Accept the connection, then never answer.
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let timeout = Duration::from_millis(200);
        let transport = HttpTransport::connect(&url, &HashMap::new(), timeout).await.unwrap();
        match transport.request("tools/call", None).await {
            Err(McpError::Timeout(d)) => assert_eq!(d, timeout),
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_serialized() {
        let responses = (1..=5)
            .map(|id| {
                http_response(
                    "",
                    "application/json",
                    &format!(r#"{{"jsonrpc":"2.0","id":{},"result":{{}}}}"#, id),
                )
            })
            .collect();
        let (url, server) = serve(responses).await;
        let transport = HttpTransport::connect(&url, &HashMap::new(), TIMEOUT).await.unwrap();

        let calls = (0..5).map(|_| transport.request("ping", None));
        let results = futures::future::join_all(calls).await;

        let mut ids: Vec<u64> = results.into_iter().map(|r| r.unwrap().id.unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        // Each connection carried exactly the id it was answered with.
        let requests = server.await.unwrap();
        for (i, raw) in requests.iter().enumerate() {
            assert!(raw.contains(&format!(r#""id":{}"#, i + 1)), "request {}: {}", i, raw);
        }
    }
}
