use emotions_core::{open_pool, DatabaseTarget, PoolConfig, SqliteEmotionRepository};
use emotions_mcp::protocol::JsonRpcResponse;
use emotions_mcp::transport::stdio::serve_lines;
use emotions_mcp::EmotionsMcpServer;
use serde_json::{json, Value};
use std::io::Cursor;
use tempfile::TempDir;

fn file_server() -> (TempDir, EmotionsMcpServer<SqliteEmotionRepository>) {
    let dir = tempfile::tempdir().unwrap();
    let target = DatabaseTarget::File(dir.path().join("emotions.sqlite3"));
    let pool = open_pool(&target, &PoolConfig::default()).unwrap();
    (dir, EmotionsMcpServer::new(SqliteEmotionRepository::new(pool)))
}

fn call(id: i64, tool: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    })
    .to_string()
}

fn run_session(server: &EmotionsMcpServer<SqliteEmotionRepository>, lines: &[String]) -> Vec<JsonRpcResponse> {
    let input = lines.join("\n");
    let mut output = Vec::new();
    serve_lines(server, Cursor::new(input), &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn tool_text(response: &JsonRpcResponse) -> (bool, String) {
    let result = response.result.as_ref().unwrap();
    let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    (is_error, text)
}

#[test]
fn full_session_over_line_transport() {
    let (_dir, server) = file_server();
    let lines = vec![
        json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} }).to_string(),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        String::new(),
        call(1, "tableExists", json!({})),
        call(2, "createTable", json!({})),
        call(3, "tableExists", json!({})),
        call(
            4,
            "insertEmotion",
            json!({ "userContext": "anna", "emotion": { "emotion": "Angst", "alter": 12 } }),
        ),
        call(
            5,
            "insertEmotion",
            json!({ "userContext": "anna", "emotion": { "emotion": "Wut", "alter": 40 } }),
        ),
        call(6, "getRecentEmotions", json!({ "userContext": "anna", "limit": 1 })),
        call(7, "deleteEmotion", json!({ "userContext": "anna", "nummer": 1 })),
        call(8, "getEmotion", json!({ "userContext": "anna", "nummer": 1 })),
        call(9, "getEmotions", json!({ "userContext": "anna" })),
    ];

    let responses = run_session(&server, &lines);
    // The notification and the blank line produce no output.
    assert_eq!(responses.len(), lines.len() - 2);

    let ids = responses
        .iter()
        .map(|response| response.id.clone().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ids, (0..=9).map(|id| json!(id)).collect::<Vec<_>>());

    assert_eq!(
        responses[0].result.as_ref().unwrap()["protocolVersion"],
        "2024-11-05"
    );
    assert_eq!(tool_text(&responses[1]), (false, r#"{"exists":false}"#.to_string()));
    assert_eq!(tool_text(&responses[2]), (false, "Table created successfully".to_string()));
    assert_eq!(tool_text(&responses[3]), (false, r#"{"exists":true}"#.to_string()));

    let (is_error, text) = tool_text(&responses[4]);
    assert!(!is_error);
    let created: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(created["nummer"], 1);
    assert_eq!(created["userContext"], "anna");

    let (_, text) = tool_text(&responses[6]);
    let recent: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(recent.as_array().unwrap().len(), 1);
    assert_eq!(recent[0]["emotion"], "Wut");

    assert_eq!(tool_text(&responses[7]), (false, "Emotion deleted successfully".to_string()));
    assert_eq!(tool_text(&responses[8]), (true, "Error: Emotion not found".to_string()));

    let (_, text) = tool_text(&responses[9]);
    let remaining: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(remaining.as_array().unwrap().len(), 1);
    assert_eq!(remaining[0]["nummer"], 2);
}

#[test]
fn tools_list_publishes_every_tool_with_schema() {
    let (_dir, server) = file_server();
    let lines = vec![json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }).to_string()];

    let responses = run_session(&server, &lines);
    let tools = responses[0].result.as_ref().unwrap()["tools"]
        .as_array()
        .unwrap()
        .clone();
    let mut names = tools
        .iter()
        .map(|tool| tool["name"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    names.sort();

    assert_eq!(
        names,
        vec![
            "createTable",
            "deleteEmotion",
            "getEmotion",
            "getEmotions",
            "getRecentEmotions",
            "insertEmotion",
            "tableExists",
            "updateEmotion",
        ]
    );
    assert!(tools
        .iter()
        .all(|tool| tool["inputSchema"]["type"] == "object"));
}

#[test]
fn malformed_lines_do_not_end_the_session() {
    let (_dir, server) = file_server();
    let lines = vec![
        "this is not json".to_string(),
        json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }).to_string(),
    ];

    let responses = run_session(&server, &lines);
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].error.as_ref().unwrap().code, -32700);
    assert_eq!(responses[1].result, Some(json!({})));
}

#[test]
fn store_errors_before_create_table_become_error_envelopes() {
    let (_dir, server) = file_server();
    let lines = vec![call(
        1,
        "insertEmotion",
        json!({ "userContext": "anna", "emotion": { "emotion": "Angst" } }),
    )];

    let responses = run_session(&server, &lines);
    let (is_error, text) = tool_text(&responses[0]);
    assert!(is_error);
    assert!(text.starts_with("Error: "));
    assert!(text.contains("no such table"));
}
