//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! # Message Types
//!
//! - **Request**: a message expecting a response (has `id`)
//! - **Notification**: a one-way message (no `id`, never answered)
//! - **Response / Error**: built as text by [`crate::mcp::codec`]
//!
//! Incoming lines are decoded with the field extractor in
//! [`crate::mcp::extract`] rather than a full JSON parser. Only the envelope
//! is inspected; `params` is carried on as raw text.

use thiserror::Error;

use crate::error::AppErrorCode;
use crate::mcp::codec;
use crate::mcp::extract::{extract_int, extract_object, extract_string, find_value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2025-11-25";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "remote-juggler";

/// A JSON-RPC 2.0 request ID, echoed back verbatim in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
    /// Explicit `null` ID.
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A decoded JSON-RPC 2.0 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Envelope version; always `"2.0"` once parsed.
    pub version: String,

    /// Request identifier; `None` marks a notification.
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Raw JSON text of the `params` object (`{}` when absent).
    pub params: String,
}

impl Request {
    /// Returns `true` if this message carries no id.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Reasons a line is rejected before a [`Request`] is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The trimmed line is not wrapped in braces.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The `jsonrpc` field is absent or not a string.
    #[error("missing jsonrpc version")]
    MissingVersion,

    /// The `jsonrpc` field is present but not `"2.0"`.
    #[error("unsupported jsonrpc version: {0}")]
    UnsupportedVersion(String),

    /// The `method` field is absent, empty, or not a string.
    #[error("missing method")]
    MissingMethod,
}

/// Decodes one line into a [`Request`].
///
/// Checks run in order and the first failure wins: the line must look like an
/// object, `jsonrpc` must be exactly `"2.0"`, and `method` must be a non-empty
/// string.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first failed check. The failed
/// message carries no usable id, so callers answer with a parse error
/// addressed to id `0`.
pub fn parse_request(line: &str) -> Result<Request, ParseError> {
    let json = line.trim();
    if !json.starts_with('{') || !json.ends_with('}') {
        return Err(ParseError::NotAnObject);
    }

    let version = extract_string(json, "jsonrpc").ok_or(ParseError::MissingVersion)?;
    if version != "2.0" {
        return Err(ParseError::UnsupportedVersion(version));
    }

    let method = extract_string(json, "method")
        .filter(|m| !m.is_empty())
        .ok_or(ParseError::MissingMethod)?;

    let params = extract_object(json, "params").unwrap_or("{}").to_string();

    Ok(Request {
        version,
        id: extract_id(json),
        method,
        params,
    })
}

/// Reads the `id` field: explicit `null`, then integer, then string.
/// Anything else is treated as absent.
fn extract_id(json: &str) -> Option<RequestId> {
    let value = find_value(json, "id")?;
    if value.starts_with("null") {
        return Some(RequestId::Null);
    }
    if let Some(n) = extract_int(json, "id") {
        return Some(RequestId::Number(n));
    }
    extract_string(json, "id").map(RequestId::String)
}

/// JSON-RPC 2.0 error codes plus the application code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Domain failure reported by a tool collaborator.
    Application(AppErrorCode),
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::Application(app) => app.code(),
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::Application(app) => app.message(),
        }
    }
}

/// A JSON-RPC 2.0 error addressed to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    /// The request ID this error corresponds to.
    pub id: RequestId,

    /// The error code.
    pub code: ErrorCode,

    /// A short description of the error.
    pub message: String,
}

impl RpcError {
    /// Creates a new error with a custom message.
    #[must_use]
    pub fn new(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            code,
            message: message.into(),
        }
    }

    /// Creates an error carrying the code's default message.
    #[must_use]
    pub fn from_code(id: RequestId, code: ErrorCode) -> Self {
        Self::new(id, code, code.default_message())
    }

    /// Creates a parse error response (ID cannot be determined, so `0`).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::from_code(RequestId::Number(0), ErrorCode::ParseError)
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(id, ErrorCode::InvalidRequest, message)
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            id,
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(id, ErrorCode::InvalidParams, message)
    }

    /// Renders the error as a JSON-RPC error response line.
    #[must_use]
    pub fn to_message(&self) -> String {
        codec::error_response(&self.id, self.code.code(), &self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_request(json).unwrap();

        assert_eq!(req.version, "2.0");
        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.method, "initialize");
        assert_eq!(req.params, "{}");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let req = parse_request(json).unwrap();

        assert!(req.is_notification());
        assert_eq!(req.method, "notifications/initialized");
    }

    #[test]
    fn parse_string_id_kept_verbatim() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn parse_null_id() {
        let json = r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::Null));
    }

    #[test]
    fn parse_negative_id() {
        let json = r#"{"jsonrpc":"2.0","id":-5,"method":"ping"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::Number(-5)));
    }

    #[test]
    fn unusable_id_is_absent() {
        let json = r#"{"jsonrpc":"2.0","id":{"x":1},"method":"ping"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, None);
    }

    #[test]
    fn params_are_raw_text() {
        let json = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"x","arguments":{"a":[1,2]}}}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.params, r#"{"name":"x","arguments":{"a":[1,2]}}"#);
    }

    #[test]
    fn params_default_when_not_object() {
        let json = r#"{"jsonrpc":"2.0","id":3,"method":"ping","params":[1,2]}"#;
        assert_eq!(parse_request(json).unwrap().params, "{}");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let json = "  {\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\r";
        assert!(parse_request(json).is_ok());
    }

    #[test]
    fn parse_invalid_json() {
        assert_eq!(parse_request("not valid json"), Err(ParseError::NotAnObject));
        assert_eq!(parse_request("[1,2,3]"), Err(ParseError::NotAnObject));
    }

    #[test]
    fn parse_missing_jsonrpc() {
        let json = r#"{"id": 1, "method": "test"}"#;
        assert_eq!(parse_request(json), Err(ParseError::MissingVersion));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        assert_eq!(
            parse_request(json),
            Err(ParseError::UnsupportedVersion("1.0".to_string()))
        );

        let json = r#"{"jsonrpc": 2.0, "id": 1, "method": "test"}"#;
        assert_eq!(parse_request(json), Err(ParseError::MissingVersion));
    }

    #[test]
    fn version_checked_before_method() {
        let json = r#"{"jsonrpc": "1.0"}"#;
        assert!(matches!(
            parse_request(json),
            Err(ParseError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn parse_missing_or_empty_method() {
        let json = r#"{"jsonrpc": "2.0", "id": 1}"#;
        assert_eq!(parse_request(json), Err(ParseError::MissingMethod));

        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": ""}"#;
        assert_eq!(parse_request(json), Err(ParseError::MissingMethod));
    }

    #[test]
    fn error_codes() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(
            ErrorCode::Application(AppErrorCode::IdentityNotFound).code(),
            1001
        );
    }

    #[test]
    fn parse_error_uses_fallback_id() {
        let json = RpcError::parse_error().to_message();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32700,"message":"Parse error"}}"#
        );
    }

    #[test]
    fn serialise_error_response() {
        let json = RpcError::method_not_found(RequestId::Number(1), "unknown/method").to_message();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
    }

    #[test]
    fn application_and_standard_errors_share_a_shape() {
        let app = RpcError::from_code(
            RequestId::Number(9),
            ErrorCode::Application(AppErrorCode::KeychainError),
        )
        .to_message();
        let std = RpcError::new(
            RequestId::Number(9),
            ErrorCode::InternalError,
            "Keychain error",
        )
        .to_message();

        let app: serde_json::Value = serde_json::from_str(&app).unwrap();
        let std: serde_json::Value = serde_json::from_str(&std).unwrap();
        assert_eq!(app["error"]["code"], 1005);
        assert_eq!(std["error"]["code"], -32603);
        assert_eq!(app["error"]["message"], std["error"]["message"]);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
        assert_eq!(format!("{}", RequestId::Null), "null");
    }
}
