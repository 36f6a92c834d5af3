use super::*;
use crate::llm::chat::ChatRole;
use crate::models::chat::Message;
use futures::StreamExt;

fn request() -> ChatRequest {
    ChatRequest::new(&[Message::system("be helpful"), Message::user("What is a loader?")], 0.7, 1000)
}

fn sse_body(chunks: &[serde_json::Value]) -> String {
    let mut lines = chunks
        .iter()
        .map(|c| format!("data: {}\n\n", c))
        .collect::<Vec<_>>();
    lines.push("data: [DONE]\n\n".to_string());
    lines.concat()
}

#[tokio::test]
async fn test_complete_returns_assistant_message() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/v1/chat/completions")
        .match_header("Authorization", "Bearer test_token")
        .match_body(
            mockito::Matcher::PartialJson(
                serde_json::json!({
                "model": "gpt-4o",
                "temperature": 0.7,
                "max_tokens": 1000,
                "stream": false
            })
            )
        )
        .with_status(200)
        .with_body(
            serde_json::json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "A loader provides data." },
                    "finish_reason": "stop"
                }]
            }).to_string()
        )
        .create_async().await;

    let client = OpenAIChatClient::new("test_token", None, Some(server.url())).unwrap();
    let resp = client.complete(&request()).await.expect("completion failed");

    assert_eq!(resp.message.role, ChatRole::Assistant);
    assert_eq!(resp.text(), "A loader provides data.");
    handler.assert_async().await;
}

#[test]
fn test_payload_omits_tools_when_none_registered() {
    let client = OpenAIChatClient::new("k", None, None).unwrap();
    let req = request();
    let json = serde_json::to_value(client.payload(&req, false)).unwrap();
    assert!(json.get("tools").is_none());
    assert_eq!(json["model"], "gpt-4o");
    assert_eq!(json["messages"][1]["content"], "What is a loader?");
}

#[test]
fn test_payload_includes_tool_definitions() {
    let client = OpenAIChatClient::new("k", Some("gpt-4o-mini".to_string()), None).unwrap();
    let req = request().with_tools(
        vec![ToolDefinition {
            kind: "function",
            function: crate::llm::chat::FunctionDefinition {
                name: "web_search".to_string(),
                description: "search".to_string(),
                parameters: serde_json::json!({ "type": "object" }),
            },
        }]
    );
    let json = serde_json::to_value(client.payload(&req, true)).unwrap();
    assert_eq!(json["model"], "gpt-4o-mini");
    assert_eq!(json["stream"], true);
    assert_eq!(json["tools"][0]["function"]["name"], "web_search");
}

#[tokio::test]
async fn test_complete_surfaces_upstream_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async().await;

    let client = OpenAIChatClient::new("bad", None, Some(server.url())).unwrap();
    match client.complete(&request()).await {
        Err(LlmError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Incorrect API key"));
        }
        other => panic!("expected status error, got {:?}", other.map(|r| r.text())),
    }
}

#[tokio::test]
async fn test_stream_yields_text_deltas() {
    let body = sse_body(
        &[
            serde_json::json!({"choices":[{"delta":{"role":"assistant","content":""},"finish_reason":null}]}),
            serde_json::json!({"choices":[{"delta":{"content":"Hello "},"finish_reason":null}]}),
            serde_json::json!({"choices":[{"delta":{"content":"there!"},"finish_reason":null}]}),
            serde_json::json!({"choices":[{"delta":{},"finish_reason":"stop"}]}),
        ]
    );

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({ "stream": true })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async().await;

    let client = OpenAIChatClient::new("k", None, Some(server.url())).unwrap();
    let events: Vec<_> = client
        .stream(&request()).await
        .unwrap()
        .map(|e| e.unwrap())
        .collect().await;

    assert_eq!(
        events,
        vec![StreamEvent::Delta("Hello ".to_string()), StreamEvent::Delta("there!".to_string())]
    );
}

#[tokio::test]
async fn test_stream_assembles_fragmented_tool_calls() {
    let body = sse_body(
        &[
            serde_json::json!({"choices":[{"delta":{"role":"assistant","content":null,"tool_calls":[
                {"index":0,"id":"call_abc","type":"function","function":{"name":"react_router_docs","arguments":""}}
            ]},"finish_reason":null}]}),
            serde_json::json!({"choices":[{"delta":{"tool_calls":[
                {"index":0,"function":{"arguments":"{\"query\":"}}
            ]},"finish_reason":null}]}),
            serde_json::json!({"choices":[{"delta":{"tool_calls":[
                {"index":0,"function":{"arguments":"\"loaders\"}"}}
            ]},"finish_reason":null}]}),
            serde_json::json!({"choices":[{"delta":{},"finish_reason":"tool_calls"}]}),
        ]
    );

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(body)
        .create_async().await;

    let client = OpenAIChatClient::new("k", None, Some(server.url())).unwrap();
    let events: Vec<_> = client
        .stream(&request()).await
        .unwrap()
        .map(|e| e.unwrap())
        .collect().await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::ToolCalls(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].id, "call_abc");
            assert_eq!(calls[0].function.name, "react_router_docs");
            assert_eq!(calls[0].function.arguments, r#"{"query":"loaders"}"#);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_error_status_fails_before_streaming() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
        .create_async().await;

    let client = OpenAIChatClient::new("k", None, Some(server.url())).unwrap();
    let err = client.stream(&request()).await.err().expect("expected error");
    assert!(matches!(err, LlmError::Status { status: 429, .. }));
}
