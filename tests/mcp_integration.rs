//! Integration tests for MCP protocol handling.
//!
//! These drive a full server over in-memory stdio and check the exact lines
//! it writes back, including ordering and lifecycle behaviour.

use std::io::Write;

use serde_json::Value;
use tokio::io::BufReader;

use remote_juggler::config::{load_config, Config};
use remote_juggler::juggler::IdentityTools;
use remote_juggler::mcp::{Lifecycle, McpServer, StdioTransport};

/// Runs `input` through a server and returns the lines written to stdout.
async fn run_session(server: &mut McpServer<IdentityTools>, input: &str) -> Vec<String> {
    let mut transport = StdioTransport::with_io(BufReader::new(input.as_bytes()), Vec::new());
    server.serve(&mut transport).await.unwrap();

    let (_, written) = transport.into_inner();
    String::from_utf8(written)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn empty_server() -> McpServer<IdentityTools> {
    McpServer::new(IdentityTools::new(Config::default()))
}

fn parse(line: &str) -> Value {
    serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON {line:?}: {e}"))
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initialize_then_exit() {
    let mut server = empty_server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-11-25","clientInfo":{"name":"test-client","version":"1.0.0"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"exit"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n",
    );

    let lines = run_session(&mut server, input).await;

    assert_eq!(lines.len(), 1, "nothing may be written after exit");
    assert!(lines[0].contains(r#""protocolVersion":"2025-11-25""#));
    assert!(lines[0].contains(r#""serverInfo":{"name":"remote-juggler""#));

    let reply = parse(&lines[0]);
    assert_eq!(reply["jsonrpc"], "2.0");
    assert_eq!(reply["id"], 1);
    assert_eq!(reply["result"]["capabilities"]["tools"]["listChanged"], false);

    assert_eq!(server.state().lifecycle(), Lifecycle::Ready);
    assert_eq!(server.state().client_name(), "test-client");
    assert_eq!(server.state().client_version(), "1.0.0");
}

#[tokio::test]
async fn test_tools_call_before_initialize() {
    let mut server = empty_server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"juggler_list_identities"}}"#,
        "\n",
    );

    let lines = run_session(&mut server, input).await;
    assert_eq!(lines.len(), 1);

    let reply = parse(&lines[0]);
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["error"]["message"], "Server not initialized");
    assert_eq!(server.state().lifecycle(), Lifecycle::Uninitialized);
}

#[tokio::test]
async fn test_shutdown_blocks_tool_calls() {
    let mut server = empty_server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"shutdown"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"juggler_config_show"}}"#,
        "\n",
    );

    let lines = run_session(&mut server, input).await;
    assert_eq!(lines.len(), 3);

    let shutdown = parse(&lines[1]);
    assert_eq!(shutdown["id"], 2);
    assert!(shutdown["result"].is_null());

    let call = parse(&lines[2]);
    assert_eq!(call["error"]["code"], -32600);
    assert_eq!(server.state().lifecycle(), Lifecycle::ShuttingDown);
}

// =============================================================================
// Framing and ordering
// =============================================================================

#[tokio::test]
async fn test_responses_follow_request_order() {
    let mut server = empty_server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#,
        "\n",
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        "not json at all\n",
        r#"{"jsonrpc":"1.0","id":9,"method":"ping"}"#,
        "\r\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"resources/read","params":{"uri":"x"}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":null,"method":"prompts/list"}"#,
        "\n",
    );

    let lines = run_session(&mut server, input).await;
    let replies: Vec<Value> = lines.iter().map(|l| parse(l)).collect();
    assert_eq!(replies.len(), 5);

    assert_eq!(replies[0]["id"], "a");
    assert_eq!(replies[0]["result"], serde_json::json!({}));

    assert_eq!(replies[1]["id"], 0);
    assert_eq!(replies[1]["error"]["code"], -32700);

    assert_eq!(replies[2]["id"], 0);
    assert_eq!(replies[2]["error"]["code"], -32700);

    assert_eq!(replies[3]["id"], 3);
    assert_eq!(replies[3]["error"]["code"], -32601);
    assert_eq!(
        replies[3]["error"]["message"],
        "Method not found: resources/read"
    );

    assert!(replies[4]["id"].is_null());
    assert_eq!(replies[4]["result"]["prompts"], serde_json::json!([]));

    // The notification moved the server to Ready without a reply.
    assert_eq!(server.state().lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn test_non_utf8_line_does_not_end_session() {
    let mut server = empty_server();
    let input: &[u8] = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"x\":\"\xff\"}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
    let mut transport = StdioTransport::with_io(input, Vec::new());
    server.serve(&mut transport).await.unwrap();

    let (_, written) = transport.into_inner();
    let written = String::from_utf8(written).unwrap();
    let replies: Vec<Value> = written.lines().map(parse).collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["id"], 0);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert_eq!(replies[1]["id"], 2);
    assert_eq!(replies[1]["result"], serde_json::json!({}));
}

#[tokio::test]
async fn test_eof_without_exit() {
    let mut server = empty_server();
    let lines = run_session(&mut server, "").await;
    assert!(lines.is_empty());
    assert_eq!(server.state().lifecycle(), Lifecycle::Uninitialized);
}

// =============================================================================
// Identity tools end to end
// =============================================================================

fn config_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "version": "2.0.0",
            "identities": {{
                "personal": {{
                    "provider": "gitlab",
                    "host": "gitlab-personal",
                    "hostname": "gitlab.com",
                    "user": "personaluser",
                    "email": "personal@example.com"
                }},
                "work": {{
                    "provider": "github",
                    "host": "github-work",
                    "user": "workuser",
                    "email": "work@company.com",
                    "gpg": {{ "keyId": "ABCD1234EF", "signCommits": true }}
                }}
            }},
            "settings": {{ "defaultProvider": "gitlab" }}
        }}"#
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_tools_list_and_call() {
    let file = config_file();
    let config = load_config(Some(file.path())).unwrap();
    let mut server = McpServer::new(IdentityTools::new(config));

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"juggler_list_identities","arguments":{"provider":"github"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"juggler_validate","arguments":{"identity":"ghost"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"arguments":{}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"juggler_validate","arguments":{"identity":"work"}}}"#,
        "\n",
    );

    let lines = run_session(&mut server, input).await;
    let replies: Vec<Value> = lines.iter().map(|l| parse(l)).collect();
    assert_eq!(replies.len(), 6);

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        [
            "juggler_list_identities",
            "juggler_config_show",
            "juggler_validate",
            "juggler_detect_identity",
            "juggler_status"
        ]
    );
    assert_eq!(tools[2]["inputSchema"]["required"][0], "identity");

    let listed = &replies[2]["result"];
    assert_eq!(listed["isError"], false);
    let text = listed["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Identities (1):"));
    assert!(text.contains("workuser"));

    let missing = &replies[3]["result"];
    assert_eq!(missing["isError"], true);
    assert!(missing["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Error 1001: Identity not found:"));

    assert_eq!(replies[4]["error"]["code"], -32602);
    assert_eq!(
        replies[4]["error"]["message"],
        "Missing required parameter: name"
    );

    let validated = &replies[5]["result"];
    assert_eq!(validated["isError"], false);
    assert!(validated["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("[PASS] GPG key id: ABCD1234EF"));
}

#[tokio::test]
async fn test_tool_text_is_escaped() {
    let file = config_file();
    let config = load_config(Some(file.path())).unwrap();
    let mut server = McpServer::new(IdentityTools::new(config));

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"juggler_config_show","arguments":{"section":"settings"}}}"#,
        "\n",
    );

    let lines = run_session(&mut server, input).await;
    assert_eq!(lines.len(), 2);

    // Multi-line pretty JSON must arrive as a single escaped line.
    let reply = parse(&lines[1]);
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains('\n'));
    let settings: Value = serde_json::from_str(text).unwrap();
    assert_eq!(settings["defaultProvider"], "gitlab");
}
