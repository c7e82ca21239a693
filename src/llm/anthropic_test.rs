// ABOUTME: Tests for Anthropic client type conversions.
// ABOUTME: Verifies serialization matches Anthropic API format.

use super::*;
use crate::error::LlmError;

#[test]
fn test_request_serialization() {
    let req = Request::new("claude-sonnet-4-20250514")
        .message(Message::user("Hello"))
        .system("You are a shell assistant")
        .max_tokens(1024);

    let anthropic_req = AnthropicRequest::from(&req);

    assert_eq!(anthropic_req.model, "claude-sonnet-4-20250514");
    assert_eq!(anthropic_req.max_tokens, 1024);
    assert_eq!(
        anthropic_req.system,
        Some("You are a shell assistant".to_string())
    );
    assert_eq!(anthropic_req.messages.len(), 1);
    assert_eq!(anthropic_req.messages[0].role, "user");
}

#[test]
fn test_request_defaults_max_tokens() {
    let req = Request::new("claude-sonnet-4-20250514").message(Message::user("Hello"));
    let json = serde_json::to_value(AnthropicRequest::from(&req)).unwrap();

    assert_eq!(json["max_tokens"], 4096);
    assert_eq!(json["messages"][0]["content"][0]["type"], "text");
    assert!(json.get("tools").is_none());
}

#[test]
fn test_tool_serialization() {
    let tool = ToolDefinition {
        name: "github_create_issue".to_string(),
        description: "Open an issue".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"}
            }
        }),
    };

    let json = serde_json::to_value(AnthropicTool::from(&tool)).unwrap();

    assert_eq!(json["name"], "github_create_issue");
    assert_eq!(json["description"], "Open an issue");
    assert!(json["input_schema"]["properties"]["title"].is_object());
}

#[test]
fn test_text_response() {
    let json = r#"{
        "id": "msg_123",
        "content": [{"type": "text", "text": "Hello!"}],
        "stop_reason": "end_turn",
        "model": "claude-sonnet-4-20250514",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    }"#;

    let anthropic_resp: AnthropicResponse = serde_json::from_str(json).unwrap();
    let response = Response::from(anthropic_resp);

    assert_eq!(response.id, "msg_123");
    assert_eq!(response.text(), "Hello!");
    assert!(!response.has_tool_calls());
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.input_tokens, 10);
}

#[test]
fn test_tool_use_input_is_string_encoded() {
    let json = r#"{
        "id": "msg_456",
        "content": [
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "Listing files."},
            {"type": "tool_use", "id": "tu_1", "name": "run_command", "input": {"command": "ls"}}
        ],
        "stop_reason": "tool_use",
        "model": "claude-sonnet-4-20250514",
        "usage": {"input_tokens": 20, "output_tokens": 15}
    }"#;

    let response = Response::from(serde_json::from_str::<AnthropicResponse>(json).unwrap());

    assert_eq!(response.stop_reason, StopReason::ToolUse);
    assert_eq!(response.text(), "Listing files.");
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "tu_1");
    assert_eq!(response.tool_calls[0].arguments()["command"], "ls");
}

#[test]
fn test_tool_result_message() {
    let msg = Message::tool_results(vec![
        ContentBlock::tool_result("tu_1", "file.txt"),
        ContentBlock::tool_error("tu_2", "Error: unknown tool 'nope'"),
    ]);

    let json = serde_json::to_value(AnthropicMessage::from(&msg)).unwrap();

    assert_eq!(json["role"], "user");
    assert_eq!(json["content"][0]["type"], "tool_result");
    assert_eq!(json["content"][0]["tool_use_id"], "tu_1");
    assert_eq!(json["content"][1]["is_error"], true);
}

#[test]
fn test_tool_role_maps_to_user() {
    let msg = Message::tool_result(ContentBlock::tool_result("tu_1", "ok"));
    assert_eq!(AnthropicMessage::from(&msg).role, "user");
}

#[test]
fn test_uses_bundled_appender() {
    let client = AnthropicClient::new("key");
    let mut history = Vec::new();
    let response = Response::from_tool_calls(vec![
        ToolCall::new("a", "x", "{}"),
        ToolCall::new("b", "y", "{}"),
    ]);
    let results = vec![
        crate::tool::ToolResult::text("a", "1"),
        crate::tool::ToolResult::text("b", "2"),
    ];

    client
        .result_appender()
        .append(&mut history, &response, &results);

    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::User);
}

#[tokio::test]
async fn test_api_error_is_mapped() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1/messages", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let _ = socket.read(&mut buf).await;
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let response = format!(
            "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });

    let client = AnthropicClient::new("bad").with_base_url(url);
    let req = Request::new("claude-sonnet-4-20250514").message(Message::user("hi"));

    match client.create_message(&req).await {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid x-api-key");
        }
        other => panic!("Expected API error, got {:?}", other.map(|r| r.id)),
    }
}
