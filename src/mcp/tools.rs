//! The interface between the MCP core and tool collaborators.
//!
//! The core never knows what a tool does. It lists descriptors for
//! `tools/list` and forwards `tools/call` to [`ToolRegistry::execute_tool`]
//! with the raw `arguments` object.

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input, as raw JSON text.
    pub input_schema: String,
}

impl ToolDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: input_schema.into(),
        }
    }
}

/// Result of a tool execution.
///
/// A failed tool is still a successful JSON-RPC exchange; the failure is
/// reported to the client through `isError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Whether the tool succeeded.
    pub success: bool,
    /// Text shown to the client.
    pub text: String,
}

impl ToolOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
        }
    }
}

/// A set of callable tools.
pub trait ToolRegistry {
    /// Returns the available tools, in the order they should be listed.
    fn tool_definitions(&self) -> Vec<ToolDescriptor>;

    /// Runs the named tool with its raw JSON `arguments` object.
    ///
    /// `args_json` is always a JSON object, `{}` when the client sent none.
    /// Unknown tool names must be reported as a failed outcome.
    fn execute_tool(&self, name: &str, args_json: &str) -> ToolOutcome;
}
