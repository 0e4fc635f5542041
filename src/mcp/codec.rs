//! JSON-RPC message formatting.
//!
//! Pure string builders; nothing here performs I/O or validates the JSON
//! fragments it is given. Every builder produces a single line (no embedded
//! newlines), as required by the stdio transport.

use std::fmt::Write as _;

use crate::mcp::protocol::{RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME};
use crate::mcp::tools::ToolDescriptor;

/// Escapes a string for inclusion between JSON quotes.
///
/// `"` `\` newline, carriage return and tab use their two-character escapes.
/// Other control characters are written as `\u00XX`.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out
}

/// Reverses the two-character escapes produced by [`escape`].
///
/// Any other backslash sequence (including `\uXXXX`) is left as-is.
#[must_use]
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Renders a request id as a JSON value.
#[must_use]
pub fn id_json(id: &RequestId) -> String {
    match id {
        RequestId::Number(n) => n.to_string(),
        RequestId::String(s) => format!("\"{}\"", escape(s)),
        RequestId::Null => "null".to_string(),
    }
}

/// Builds a success response. `result_json` must already be valid JSON.
#[must_use]
pub fn response(id: &RequestId, result_json: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","id":{},"result":{result_json}}}"#,
        id_json(id)
    )
}

/// Builds an error response. The code is emitted verbatim, sign included.
#[must_use]
pub fn error_response(id: &RequestId, code: i32, message: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","id":{},"error":{{"code":{code},"message":"{}"}}}}"#,
        id_json(id),
        escape(message)
    )
}

/// Builds a server-to-client notification. Notifications carry no `id`.
#[must_use]
pub fn notification(method: &str, params_json: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","method":"{}","params":{params_json}}}"#,
        escape(method)
    )
}

/// `notifications/tools/list_changed`
#[must_use]
pub fn tools_list_changed_notification() -> String {
    notification("notifications/tools/list_changed", "{}")
}

/// `notifications/progress` for a long-running request.
#[must_use]
pub fn progress_notification(progress_token: &str, progress: u64, total: Option<u64>) -> String {
    let total = total.map_or_else(|| "null".to_string(), |t| t.to_string());
    notification(
        "notifications/progress",
        &format!(
            r#"{{"progressToken":"{}","progress":{progress},"total":{total}}}"#,
            escape(progress_token)
        ),
    )
}

/// `notifications/message` carrying a log line for the client.
#[must_use]
pub fn log_message_notification(level: &str, logger: &str, data: &str) -> String {
    notification(
        "notifications/message",
        &format!(
            r#"{{"level":"{}","logger":"{}","data":"{}"}}"#,
            escape(level),
            escape(logger),
            escape(data)
        ),
    )
}

/// Result payload for `initialize`.
#[must_use]
pub fn initialize_result(server_version: &str) -> String {
    format!(
        concat!(
            r#"{{"protocolVersion":"{}","#,
            r#""capabilities":{{"tools":{{"listChanged":false}}}},"#,
            r#""serverInfo":{{"name":"{}","version":"{}"}}}}"#
        ),
        MCP_PROTOCOL_VERSION,
        SERVER_NAME,
        escape(server_version)
    )
}

/// Result payload for `tools/list`, in registry order.
#[must_use]
pub fn tools_list_result(tools: &[ToolDescriptor]) -> String {
    let mut out = String::from(r#"{"tools":["#);
    for (i, tool) in tools.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(
            out,
            r#"{{"name":"{}","description":"{}","inputSchema":{}}}"#,
            escape(&tool.name),
            escape(&tool.description),
            tool.input_schema
        );
    }
    out.push_str("]}");
    out
}

/// Result payload for `tools/call`: the tool's text in a single content
/// block, with `isError` mirroring the tool outcome.
#[must_use]
pub fn tool_call_result(text: &str, is_error: bool) -> String {
    format!(
        r#"{{"content":[{{"type":"text","text":"{}"}}],"isError":{is_error}}}"#,
        escape(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_table() {
        assert_eq!(escape("a\"b"), r#"a\"b"#);
        assert_eq!(escape("a\\b"), r"a\\b");
        assert_eq!(escape("a\nb\rc\td"), r"a\nb\rc\td");
        assert_eq!(escape("plain text"), "plain text");
    }

    #[test]
    fn escape_other_control_characters() {
        assert_eq!(escape("\u{8}"), r"\u0008");
        assert_eq!(escape("\u{1b}[0m"), r"\u001b[0m");
    }

    #[test]
    fn unescape_leaves_unknown_sequences() {
        assert_eq!(unescape(r"A\/"), r"A\/");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn escape_unescape_inverse() {
        let samples = [
            "",
            "hello",
            "\"quoted\"",
            "back\\slash",
            "multi\nline\r\nwith\ttabs",
            "{\"nested\":\"json\\\\\"}",
            "\\n is not a newline",
        ];
        for s in samples {
            assert_eq!(unescape(&escape(s)), s, "sample: {s:?}");
        }
    }

    #[test]
    fn success_response() {
        let json = response(&RequestId::Number(7), "{}");
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":7,"result":{}}"#);
    }

    #[test]
    fn response_echoes_string_and_null_ids() {
        let json = response(&RequestId::String("req-\"1\"".to_string()), "null");
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":"req-\"1\"","result":null}"#);

        let json = response(&RequestId::Null, "{}");
        assert!(json.contains(r#""id":null"#));
    }

    #[test]
    fn error_response_escapes_message() {
        let json = error_response(&RequestId::Number(1), -32601, "Method not found: \"x\"");
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found: \"x\""}}"#
        );
    }

    #[test]
    fn error_response_keeps_positive_codes() {
        let json = error_response(&RequestId::Number(1), 1001, "Identity not found");
        assert!(json.contains(r#""code":1001"#));
    }

    #[test]
    fn notification_has_no_id() {
        let json = notification("notifications/message", "{}");
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","method":"notifications/message","params":{}}"#
        );
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn outgoing_notifications_are_valid_json() {
        let progress: serde_json::Value =
            serde_json::from_str(&progress_notification("tok", 3, Some(10))).unwrap();
        assert_eq!(progress["params"]["progressToken"], "tok");
        assert_eq!(progress["params"]["progress"], 3);
        assert_eq!(progress["params"]["total"], 10);

        let open_ended: serde_json::Value =
            serde_json::from_str(&progress_notification("tok", 1, None)).unwrap();
        assert!(open_ended["params"]["total"].is_null());

        let message: serde_json::Value = serde_json::from_str(&log_message_notification(
            "warning",
            "remote-juggler",
            "key \"work\" missing",
        ))
        .unwrap();
        assert_eq!(message["method"], "notifications/message");
        assert_eq!(message["params"]["data"], "key \"work\" missing");

        let changed: serde_json::Value =
            serde_json::from_str(&tools_list_changed_notification()).unwrap();
        assert_eq!(changed["method"], "notifications/tools/list_changed");
    }

    #[test]
    fn tools_list_preserves_order_and_raw_schema() {
        let tools = vec![
            ToolDescriptor::new("b_tool", "Second \"B\"", r#"{"type":"object"}"#),
            ToolDescriptor::new(
                "a_tool",
                "First",
                r#"{"type":"object","properties":{"x":{"type":"string"}}}"#,
            ),
        ];
        let json = tools_list_result(&tools);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tools"][0]["name"], "b_tool");
        assert_eq!(value["tools"][0]["description"], "Second \"B\"");
        assert_eq!(value["tools"][1]["name"], "a_tool");
        assert_eq!(
            value["tools"][1]["inputSchema"]["properties"]["x"]["type"],
            "string"
        );
    }

    #[test]
    fn empty_tools_list() {
        assert_eq!(tools_list_result(&[]), r#"{"tools":[]}"#);
    }

    #[test]
    fn tool_call_result_flags() {
        let ok: serde_json::Value =
            serde_json::from_str(&tool_call_result("done\nok", false)).unwrap();
        assert_eq!(ok["content"][0]["type"], "text");
        assert_eq!(ok["content"][0]["text"], "done\nok");
        assert_eq!(ok["isError"], false);

        let failed: serde_json::Value =
            serde_json::from_str(&tool_call_result("boom", true)).unwrap();
        assert_eq!(failed["isError"], true);
    }

    #[test]
    fn initialize_result_shape() {
        let json = initialize_result("1.2.3");
        assert!(json.contains(r#""protocolVersion":"2025-11-25""#));
        assert!(json.contains(r#""serverInfo":{"name":"remote-juggler","version":"1.2.3"}"#));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn builders_never_emit_newlines() {
        let json = tool_call_result("a\nb\r\nc", false);
        assert!(!json.contains('\n'));
        let json = error_response(&RequestId::Number(0), -32700, "bad\nline");
        assert!(!json.contains('\n'));
    }
}
