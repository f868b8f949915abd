use serde::{Deserialize, Serialize};

/// Role of a message as it travels on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    /// System directive.
    System,

    /// Human operator.
    User,

    /// Agent response.
    Assistant,

    /// Result of a tool invocation.
    Tool,
}

/// The function half of a [`WireToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireFunctionCall {
    /// Name of the invoked tool.
    pub name: String,

    /// Arguments, JSON-encoded.
    pub arguments: String,
}

/// A tool call attached to an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireToolCall {
    /// Identifier of the call, referenced by the matching tool message.
    pub id: String,

    /// Always "function".
    #[serde(default = "default_tool_call_type")]
    pub r#type: String,

    /// The invoked function.
    pub function: WireFunctionCall,
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

impl WireToolCall {
    /// Creates a function tool call.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: default_tool_call_type(),
            function: WireFunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A message as sent to the agent in a [`RunAgentInput`](crate::types::RunAgentInput).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Unique message identifier.
    pub id: String,

    /// Who produced the message.
    pub role: WireRole,

    /// Text content, absent for assistant messages that only carry tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls issued by an assistant message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,

    /// For tool messages, the call this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    /// Creates a plain text message.
    pub fn text(id: impl Into<String>, role: WireRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}
