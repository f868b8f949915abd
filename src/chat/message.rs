//! Transcript entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::{WireMessage, WireRole, WireToolCall};

/// Who produced a transcript message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The student.
    User,

    /// The agent.
    Assistant,

    /// A tool the agent invoked.
    Tool,
}

impl MessageRole {
    /// Returns the lowercase name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call made by the agent during a turn, as observed by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Identifier the agent assigned to the call.
    pub tool_call_id: String,

    /// Name of the invoked tool.
    pub name: String,

    /// Arguments: parsed JSON when they parse, otherwise the raw text.
    pub arguments: Value,

    /// What the tool returned, if the agent reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ToolInvocation {
    /// Creates an invocation with no arguments and no result.
    pub fn new(tool_call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            arguments: Value::Object(serde_json::Map::new()),
            result: None,
        }
    }

    /// Interprets accumulated argument text.
    ///
    /// Empty text means no arguments.  Text that is not valid JSON is kept
    /// verbatim as a string.
    pub fn parse_arguments(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return Value::Object(serde_json::Map::new());
        }
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }

    /// The arguments as text suitable for the wire.
    pub fn arguments_text(&self) -> String {
        match &self.arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// One entry in a chat transcript.
///
/// Messages are immutable once appended to a
/// [`Transcript`](crate::chat::Transcript).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Backend message id, or a generated UUID.
    pub id: String,

    /// Who produced the message.
    pub role: MessageRole,

    /// Text content.  For tool messages, the tool's result.
    pub content: String,

    /// When the message was created.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Marks messages that record a failure rather than a real reply.
    #[serde(default)]
    pub is_error: bool,

    /// For tool messages, the invocation this message records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolInvocation>,
}

impl Message {
    fn with_role(id: String, role: MessageRole, content: String) -> Self {
        Self {
            id,
            role,
            content,
            timestamp: OffsetDateTime::now_utc(),
            is_error: false,
            tool: None,
        }
    }

    /// Creates a user message with a fresh id.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(new_message_id(), MessageRole::User, content.into())
    }

    /// Creates an assistant message.
    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_role(id.into(), MessageRole::Assistant, content.into())
    }

    /// Creates a tool message from a completed invocation.
    pub fn tool(id: impl Into<String>, invocation: ToolInvocation) -> Self {
        let content = invocation.result.clone().unwrap_or_default();
        let mut message = Self::with_role(id.into(), MessageRole::Tool, content);
        message.tool = Some(invocation);
        message
    }

    /// Creates an error-state message shown in place of a reply.
    pub fn error(content: impl Into<String>) -> Self {
        let mut message = Self::with_role(new_message_id(), MessageRole::Assistant, content.into());
        message.is_error = true;
        message
    }

    /// Converts the message into the wire messages that represent it.
    ///
    /// A tool message becomes an assistant message carrying the call,
    /// followed by a tool message carrying the result when there is one.
    pub fn to_wire(&self) -> Vec<WireMessage> {
        match (self.role, &self.tool) {
            (MessageRole::User, _) => {
                vec![WireMessage::text(&self.id, WireRole::User, &self.content)]
            }
            (MessageRole::Assistant, _) => {
                vec![WireMessage::text(&self.id, WireRole::Assistant, &self.content)]
            }
            (MessageRole::Tool, Some(invocation)) => {
                let call = WireToolCall::new(
                    &invocation.tool_call_id,
                    &invocation.name,
                    invocation.arguments_text(),
                );
                let mut wire = vec![WireMessage {
                    id: format!("{}-call", self.id),
                    role: WireRole::Assistant,
                    content: None,
                    tool_calls: Some(vec![call]),
                    tool_call_id: None,
                }];
                if let Some(result) = &invocation.result {
                    wire.push(WireMessage {
                        id: self.id.clone(),
                        role: WireRole::Tool,
                        content: Some(result.clone()),
                        tool_calls: None,
                        tool_call_id: Some(invocation.tool_call_id.clone()),
                    });
                }
                wire
            }
            (MessageRole::Tool, None) => Vec::new(),
        }
    }
}

/// Generates an id for a message the backend did not name.
pub(crate) fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}
