use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event in an agent run stream.
///
/// A run opens with `RUN_STARTED` and is terminated by either `RUN_FINISHED`
/// or `RUN_ERROR`.  Between them, text messages and tool calls are each
/// delivered as a start event, any number of incremental events, and an end
/// event, correlated by `messageId` or `toolCallId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentEvent {
    /// The agent accepted the run.
    #[serde(rename_all = "camelCase")]
    RunStarted {
        /// Thread of the run.
        thread_id: String,
        /// Identifier of the run.
        run_id: String,
    },

    /// The run completed; this is the end-of-turn signal.
    #[serde(rename_all = "camelCase")]
    RunFinished {
        /// Thread of the run.
        thread_id: String,
        /// Identifier of the run.
        run_id: String,
        /// Optional run result.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },

    /// The run failed on the agent side.
    #[serde(rename_all = "camelCase")]
    RunError {
        /// Human-readable failure.
        message: String,
        /// Machine-readable failure code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// The agent entered a named step.
    #[serde(rename_all = "camelCase")]
    StepStarted {
        /// Name of the step.
        step_name: String,
    },

    /// The agent left a named step.
    #[serde(rename_all = "camelCase")]
    StepFinished {
        /// Name of the step.
        step_name: String,
    },

    /// A text message begins.
    #[serde(rename_all = "camelCase")]
    TextMessageStart {
        /// Identifier of the message.
        message_id: String,
        /// Role of the message, normally "assistant".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },

    /// A fragment of a text message.
    #[serde(rename_all = "camelCase")]
    TextMessageContent {
        /// Identifier of the message.
        message_id: String,
        /// Text to append.
        delta: String,
    },

    /// A text message is complete.
    #[serde(rename_all = "camelCase")]
    TextMessageEnd {
        /// Identifier of the message.
        message_id: String,
    },

    /// Start and content of a text message folded into one event.
    #[serde(rename_all = "camelCase")]
    TextMessageChunk {
        /// Identifier of the message; absent means "the current message".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        /// Role of the message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        /// Text to append.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delta: Option<String>,
    },

    /// The agent begins invoking a tool.
    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        /// Identifier of the invocation.
        tool_call_id: String,
        /// Name of the tool.
        tool_call_name: String,
        /// Assistant message the call belongs to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },

    /// A fragment of the JSON-encoded tool arguments.
    #[serde(rename_all = "camelCase")]
    ToolCallArgs {
        /// Identifier of the invocation.
        tool_call_id: String,
        /// Argument text to append.
        delta: String,
    },

    /// The tool arguments are complete.
    #[serde(rename_all = "camelCase")]
    ToolCallEnd {
        /// Identifier of the invocation.
        tool_call_id: String,
    },

    /// Start and argument fragment of a tool call folded into one event.
    #[serde(rename_all = "camelCase")]
    ToolCallChunk {
        /// Identifier of the invocation; absent means "the current call".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        /// Name of the tool; present on the first chunk.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_name: Option<String>,
        /// Assistant message the call belongs to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
        /// Argument text to append.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delta: Option<String>,
    },

    /// The result the tool returned.
    #[serde(rename_all = "camelCase")]
    ToolCallResult {
        /// Identifier of the tool message carrying the result.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        /// Identifier of the invocation.
        tool_call_id: String,
        /// Result text, usually JSON.
        content: String,
        /// Role of the result message, normally "tool".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    },

    /// Complete agent state.
    StateSnapshot {
        /// The state.
        snapshot: Value,
    },

    /// Incremental agent state change as a JSON patch.
    StateDelta {
        /// The patch operations.
        delta: Value,
    },

    /// The agent's view of the complete message list.
    MessagesSnapshot {
        /// The messages.
        messages: Value,
    },

    /// A pass-through event from the agent framework.
    Raw {
        /// The wrapped event.
        event: Value,
        /// Where it came from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    /// An application-defined event.
    Custom {
        /// Name of the event.
        name: String,
        /// Payload.
        #[serde(default)]
        value: Value,
    },

    /// Any event type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    /// Returns true if this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::RunFinished { .. } | AgentEvent::RunError { .. }
        )
    }

    /// Short name of the event type, for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            AgentEvent::RunStarted { .. } => "RUN_STARTED",
            AgentEvent::RunFinished { .. } => "RUN_FINISHED",
            AgentEvent::RunError { .. } => "RUN_ERROR",
            AgentEvent::StepStarted { .. } => "STEP_STARTED",
            AgentEvent::StepFinished { .. } => "STEP_FINISHED",
            AgentEvent::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            AgentEvent::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            AgentEvent::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            AgentEvent::TextMessageChunk { .. } => "TEXT_MESSAGE_CHUNK",
            AgentEvent::ToolCallStart { .. } => "TOOL_CALL_START",
            AgentEvent::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            AgentEvent::ToolCallEnd { .. } => "TOOL_CALL_END",
            AgentEvent::ToolCallChunk { .. } => "TOOL_CALL_CHUNK",
            AgentEvent::ToolCallResult { .. } => "TOOL_CALL_RESULT",
            AgentEvent::StateSnapshot { .. } => "STATE_SNAPSHOT",
            AgentEvent::StateDelta { .. } => "STATE_DELTA",
            AgentEvent::MessagesSnapshot { .. } => "MESSAGES_SNAPSHOT",
            AgentEvent::Raw { .. } => "RAW",
            AgentEvent::Custom { .. } => "CUSTOM",
            AgentEvent::Unknown => "UNKNOWN",
        }
    }
}
