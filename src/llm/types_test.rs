// ABOUTME: Tests for LLM types - serialization, lenient argument decoding, helpers.
// ABOUTME: Verifies the canonical shapes the provider adapters build on.

use super::*;

#[test]
fn test_role_serialization() {
    assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    assert_eq!(
        serde_json::to_string(&Role::Assistant).unwrap(),
        "\"assistant\""
    );
    assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
}

#[test]
fn test_content_block_tool_use_deserialization() {
    let json = r#"{
        "type": "tool_use",
        "id": "123",
        "name": "run_command",
        "input": {"command": "uname -a"}
    }"#;
    let block: ContentBlock = serde_json::from_str(json).unwrap();
    match block {
        ContentBlock::ToolUse { id, name, input } => {
            assert_eq!(id, "123");
            assert_eq!(name, "run_command");
            assert_eq!(input["command"], "uname -a");
        }
        _ => panic!("Expected ToolUse"),
    }
}

#[test]
fn test_content_block_tool_error_serialization() {
    let block = ContentBlock::tool_error("123", "Error: unknown tool 'x'");
    let json = serde_json::to_value(&block).unwrap();
    assert_eq!(json["type"], "tool_result");
    assert_eq!(json["tool_use_id"], "123");
    assert_eq!(json["is_error"], true);
}

#[test]
fn test_message_helpers() {
    let msg = Message::user("Hello");
    assert_eq!(msg.role, Role::User);
    assert_eq!(msg.text(), "Hello");

    let msg = Message::tool_result(ContentBlock::tool_result("1", "ok"));
    assert_eq!(msg.role, Role::Tool);
    assert_eq!(msg.content.len(), 1);
}

#[test]
fn test_request_builder() {
    let req = Request::new("gpt-4o-mini")
        .message(Message::user("Hi"))
        .system("You are Conch")
        .max_tokens(1024)
        .temperature(0.7);

    assert_eq!(req.model, "gpt-4o-mini");
    assert_eq!(req.messages.len(), 1);
    assert_eq!(req.system, Some("You are Conch".to_string()));
    assert_eq!(req.max_tokens, Some(1024));
    assert_eq!(req.temperature, Some(0.7));
}

#[test]
fn test_tool_call_arguments_object() {
    let call = ToolCall::new("1", "run_command", r#"{"command":"ls","timeout":5}"#);
    let args = call.arguments();
    assert_eq!(args["command"], "ls");
    assert_eq!(args["timeout"], 5);
}

#[test]
fn test_tool_call_arguments_are_lenient() {
    for raw in ["", "not json", "[1,2]", "\"str\"", "null", "{\"unterminated\":"] {
        let call = ToolCall::new("1", "x", raw);
        assert!(call.arguments().is_empty(), "expected empty args for {:?}", raw);
    }
}

#[test]
fn test_response_to_message_orders_text_then_calls() {
    let mut response = Response::from_tool_calls(vec![
        ToolCall::new("a", "first", "{}"),
        ToolCall::new("b", "second", r#"{"k":1}"#),
    ]);
    response.text = Some("on it".into());

    let msg = response.to_message();

    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content.len(), 3);
    assert_eq!(msg.content[0], ContentBlock::text("on it"));
    match &msg.content[2] {
        ContentBlock::ToolUse { id, input, .. } => {
            assert_eq!(id, "b");
            assert_eq!(input["k"], 1);
        }
        other => panic!("Expected ToolUse, got {:?}", other),
    }
}

#[test]
fn test_response_without_text() {
    let response = Response::from_tool_calls(vec![ToolCall::new("a", "x", "{}")]);
    assert!(response.has_tool_calls());
    assert_eq!(response.text(), "");
    assert_eq!(response.to_message().content.len(), 1);
}

#[test]
fn test_stop_reason_serialization() {
    assert_eq!(
        serde_json::to_string(&StopReason::ToolUse).unwrap(),
        "\"tool_use\""
    );
    assert_eq!(
        serde_json::to_string(&StopReason::EndTurn).unwrap(),
        "\"end_turn\""
    );
}
