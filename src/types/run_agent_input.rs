use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ContextItem, WireMessage};

/// Body of a run request.
///
/// One `RunAgentInput` is posted per conversational turn.  It carries the
/// complete history, so the agent needs no server-side memory of prior turns
/// beyond what it chooses to keep in `state`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    /// Conversation thread; constant for the lifetime of a session.
    pub thread_id: String,

    /// Unique per turn.
    pub run_id: String,

    /// Agent state from the last snapshot, echoed back.
    #[serde(default)]
    pub state: Value,

    /// System directive followed by the transcript.
    pub messages: Vec<WireMessage>,

    /// Client-side tools.  Always empty: this client executes no tools.
    #[serde(default)]
    pub tools: Vec<Value>,

    /// Readable context.
    #[serde(default)]
    pub context: Vec<ContextItem>,

    /// Opaque properties forwarded to the agent.
    #[serde(default)]
    pub forwarded_props: Value,
}

impl RunAgentInput {
    /// Creates a run request with empty state, tools and forwarded props.
    pub fn new(
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
        messages: Vec<WireMessage>,
        context: Vec<ContextItem>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            state: Value::Object(serde_json::Map::new()),
            messages,
            tools: Vec::new(),
            context,
            forwarded_props: Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the agent state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }
}
