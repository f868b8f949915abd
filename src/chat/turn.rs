//! Folding the events of one run into transcript messages.

use std::collections::HashMap;

use serde_json::Value;

use crate::chat::instructions::{WorkflowDeviation, WorkflowTracker};
use crate::chat::message::{Message, ToolInvocation, new_message_id};
use crate::{AgentEvent, Error, Renderer, Result};

/// Text committed in place of an event that could not be decoded.
pub const MALFORMED_PLACEHOLDER: &str = "[unreadable response from the agent]";

/// Whether a run is still going after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnProgress {
    /// More events are expected.
    Continue,
    /// `RUN_FINISHED` arrived.
    Finished,
}

/// What a run produced, ready to be committed.
#[derive(Debug, Clone)]
pub struct AccumulatedTurn {
    /// New assistant and tool messages, in first-appearance order.
    pub messages: Vec<Message>,
    /// How the run strayed from the prescribed steps.
    pub deviations: Vec<WorkflowDeviation>,
    /// The last state snapshot the agent sent, if any.
    pub agent_state: Option<Value>,
    /// Events that could not be decoded.
    pub malformed: usize,
}

enum Entry {
    Text {
        id: String,
        content: String,
    },
    Tool {
        message_id: Option<String>,
        invocation: ToolInvocation,
        raw_arguments: String,
    },
    Placeholder,
}

/// Accumulates the events of one run.
///
/// Deltas are forwarded to the renderer as they arrive; messages only leave
/// the accumulator through [`TurnAccumulator::finish`].
pub struct TurnAccumulator {
    entries: Vec<Entry>,
    texts: HashMap<String, usize>,
    tools: HashMap<String, usize>,
    open_text: Option<String>,
    open_tool: Option<String>,
    tracker: WorkflowTracker,
    agent_state: Option<Value>,
    malformed: usize,
}

impl TurnAccumulator {
    /// Creates an accumulator that checks the run against `tracker`.
    pub fn new(tracker: WorkflowTracker) -> Self {
        Self {
            entries: Vec::new(),
            texts: HashMap::new(),
            tools: HashMap::new(),
            open_text: None,
            open_tool: None,
            tracker,
            agent_state: None,
            malformed: 0,
        }
    }

    /// Applies one event.
    ///
    /// Returns an error only for `RUN_ERROR`.  A `RUN_FINISHED` that ends a
    /// run with nothing to commit leaves a placeholder in place of the reply.
    pub fn apply(&mut self, event: AgentEvent, renderer: &mut dyn Renderer) -> Result<TurnProgress> {
        match event {
            AgentEvent::RunStarted { thread_id, run_id } => {
                tracing::debug!(%thread_id, %run_id, "run started");
            }
            AgentEvent::RunFinished { .. } => {
                if !self.has_reply() {
                    self.malformed(
                        &Error::serialization("agent finished the run without a reply", None),
                        renderer,
                    );
                }
                return Ok(TurnProgress::Finished);
            }
            AgentEvent::RunError { message, code } => {
                return Err(Error::agent_run(message, code));
            }
            AgentEvent::TextMessageStart { message_id, .. } => {
                self.text_entry(&message_id);
                self.open_text = Some(message_id);
            }
            AgentEvent::TextMessageContent { message_id, delta } => {
                self.append_text(&message_id, &delta, renderer);
            }
            AgentEvent::TextMessageEnd { message_id } => {
                if self.open_text.as_deref() == Some(message_id.as_str()) {
                    self.open_text = None;
                }
            }
            AgentEvent::TextMessageChunk {
                message_id, delta, ..
            } => {
                let message_id = message_id
                    .or_else(|| self.open_text.clone())
                    .unwrap_or_else(new_message_id);
                self.text_entry(&message_id);
                if let Some(delta) = delta {
                    self.append_text(&message_id, &delta, renderer);
                }
                self.open_text = Some(message_id);
            }
            AgentEvent::ToolCallStart {
                tool_call_id,
                tool_call_name,
                ..
            } => {
                self.start_tool(&tool_call_id, &tool_call_name, renderer);
            }
            AgentEvent::ToolCallArgs {
                tool_call_id,
                delta,
            } => {
                self.append_args(&tool_call_id, &delta, renderer);
            }
            AgentEvent::ToolCallEnd { tool_call_id } => {
                self.end_tool(&tool_call_id, renderer);
            }
            AgentEvent::ToolCallChunk {
                tool_call_id,
                tool_call_name,
                delta,
                ..
            } => {
                let Some(tool_call_id) = tool_call_id.or_else(|| self.open_tool.clone()) else {
                    tracing::debug!("tool call chunk without a call to attach to");
                    return Ok(TurnProgress::Continue);
                };
                if !self.tools.contains_key(&tool_call_id) {
                    let name = tool_call_name.as_deref().unwrap_or("unknown");
                    self.start_tool(&tool_call_id, name, renderer);
                }
                if let Some(delta) = delta {
                    self.append_args(&tool_call_id, &delta, renderer);
                }
            }
            AgentEvent::ToolCallResult {
                message_id,
                tool_call_id,
                content,
                ..
            } => {
                self.tool_result(message_id, &tool_call_id, content, renderer);
            }
            AgentEvent::StateSnapshot { snapshot } => {
                self.agent_state = Some(snapshot);
            }
            other => {
                tracing::debug!(event = other.type_name(), "ignoring agent event");
            }
        }
        Ok(TurnProgress::Continue)
    }

    /// Records an event that could not be decoded.
    pub fn malformed(&mut self, error: &Error, renderer: &mut dyn Renderer) {
        tracing::warn!(error = %error, "malformed agent event");
        self.malformed += 1;
        self.entries.push(Entry::Placeholder);
        renderer.print_error(&error.to_string());
    }

    /// Deviations recorded so far.
    pub fn deviations(&self) -> &[WorkflowDeviation] {
        self.tracker.deviations()
    }

    /// Ends the run and yields its messages.
    ///
    /// Tool calls whose arguments never ended are parsed as they stand.
    /// Assistant messages with no content are dropped.
    pub fn finish(mut self) -> AccumulatedTurn {
        let mut messages = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entry {
                Entry::Text { id, content } => {
                    if !content.is_empty() {
                        messages.push(Message::assistant(id, content));
                    }
                }
                Entry::Tool {
                    message_id,
                    mut invocation,
                    raw_arguments,
                } => {
                    invocation.arguments = ToolInvocation::parse_arguments(&raw_arguments);
                    let id = message_id.unwrap_or_else(new_message_id);
                    messages.push(Message::tool(id, invocation));
                }
                Entry::Placeholder => {
                    messages.push(Message::error(MALFORMED_PLACEHOLDER));
                }
            }
        }
        AccumulatedTurn {
            messages,
            deviations: self.tracker.finish(),
            agent_state: self.agent_state,
            malformed: self.malformed,
        }
    }

    /// True once anything would be committed by [`TurnAccumulator::finish`].
    fn has_reply(&self) -> bool {
        self.entries.iter().any(|entry| match entry {
            Entry::Text { content, .. } => !content.is_empty(),
            Entry::Tool { .. } | Entry::Placeholder => true,
        })
    }

    fn text_entry(&mut self, message_id: &str) -> usize {
        if let Some(idx) = self.texts.get(message_id) {
            return *idx;
        }
        let idx = self.entries.len();
        self.entries.push(Entry::Text {
            id: message_id.to_string(),
            content: String::new(),
        });
        self.texts.insert(message_id.to_string(), idx);
        idx
    }

    fn append_text(&mut self, message_id: &str, delta: &str, renderer: &mut dyn Renderer) {
        if delta.is_empty() {
            return;
        }
        let idx = self.text_entry(message_id);
        if let Entry::Text { content, .. } = &mut self.entries[idx] {
            if content.is_empty() {
                self.tracker.observe_response();
            }
            content.push_str(delta);
        }
        renderer.print_text(delta);
    }

    fn start_tool(&mut self, tool_call_id: &str, name: &str, renderer: &mut dyn Renderer) {
        if self.tools.contains_key(tool_call_id) {
            tracing::debug!(tool_call_id, "duplicate tool call start");
            return;
        }
        self.tracker.observe_tool(name);
        self.tools.insert(tool_call_id.to_string(), self.entries.len());
        self.entries.push(Entry::Tool {
            message_id: None,
            invocation: ToolInvocation::new(tool_call_id, name),
            raw_arguments: String::new(),
        });
        self.open_tool = Some(tool_call_id.to_string());
        renderer.start_tool_call(name, tool_call_id);
    }

    fn append_args(&mut self, tool_call_id: &str, delta: &str, renderer: &mut dyn Renderer) {
        let Some(idx) = self.tools.get(tool_call_id).copied() else {
            tracing::debug!(tool_call_id, "arguments for unknown tool call");
            return;
        };
        if let Entry::Tool { raw_arguments, .. } = &mut self.entries[idx] {
            raw_arguments.push_str(delta);
        }
        renderer.print_tool_args(delta);
    }

    fn end_tool(&mut self, tool_call_id: &str, renderer: &mut dyn Renderer) {
        let Some(idx) = self.tools.get(tool_call_id).copied() else {
            tracing::debug!(tool_call_id, "end of unknown tool call");
            return;
        };
        if let Entry::Tool {
            invocation,
            raw_arguments,
            ..
        } = &mut self.entries[idx]
        {
            invocation.arguments = ToolInvocation::parse_arguments(raw_arguments);
        }
        if self.open_tool.as_deref() == Some(tool_call_id) {
            self.open_tool = None;
        }
        renderer.finish_tool_call();
    }

    fn tool_result(
        &mut self,
        message_id: Option<String>,
        tool_call_id: &str,
        content: String,
        renderer: &mut dyn Renderer,
    ) {
        let idx = match self.tools.get(tool_call_id).copied() {
            Some(idx) => idx,
            None => {
                // A result for a call this run never announced still belongs
                // in the transcript.
                let idx = self.entries.len();
                self.tools.insert(tool_call_id.to_string(), idx);
                self.entries.push(Entry::Tool {
                    message_id: None,
                    invocation: ToolInvocation::new(tool_call_id, "unknown"),
                    raw_arguments: String::new(),
                });
                idx
            }
        };
        renderer.print_tool_result(tool_call_id, &content);
        if let Entry::Tool {
            message_id: slot,
            invocation,
            ..
        } = &mut self.entries[idx]
        {
            if message_id.is_some() {
                *slot = message_id;
            }
            invocation.result = Some(content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::instructions::WorkflowStep;
    use crate::chat::message::MessageRole;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        text: String,
        tools: Vec<String>,
        errors: Vec<String>,
    }

    impl Renderer for Recorder {
        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
        }
        fn start_tool_call(&mut self, name: &str, _id: &str) {
            self.tools.push(name.to_string());
        }
        fn print_tool_args(&mut self, _partial_json: &str) {}
        fn finish_tool_call(&mut self) {}
        fn print_tool_result(&mut self, _tool_call_id: &str, _content: &str) {}
        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }
        fn print_info(&mut self, _info: &str) {}
        fn finish_response(&mut self) {}
    }

    fn content(message_id: &str, delta: &str) -> AgentEvent {
        AgentEvent::TextMessageContent {
            message_id: message_id.to_string(),
            delta: delta.to_string(),
        }
    }

    #[test]
    fn text_and_tools_commit_in_first_appearance_order() {
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(vec![]));
        let mut renderer = Recorder::default();
        let events = vec![
            AgentEvent::ToolCallStart {
                tool_call_id: "c1".to_string(),
                tool_call_name: "buscar_documentos".to_string(),
                parent_message_id: None,
            },
            AgentEvent::ToolCallArgs {
                tool_call_id: "c1".to_string(),
                delta: "{\"palabras\":".to_string(),
            },
            AgentEvent::TextMessageStart {
                message_id: "m1".to_string(),
                role: Some("assistant".to_string()),
            },
            content("m1", "La velocidad "),
            AgentEvent::ToolCallArgs {
                tool_call_id: "c1".to_string(),
                delta: "[\"v\"]}".to_string(),
            },
            AgentEvent::ToolCallEnd {
                tool_call_id: "c1".to_string(),
            },
            AgentEvent::ToolCallResult {
                message_id: Some("r1".to_string()),
                tool_call_id: "c1".to_string(),
                content: "doc".to_string(),
                role: Some("tool".to_string()),
            },
            content("m1", "es un vector."),
            AgentEvent::TextMessageEnd {
                message_id: "m1".to_string(),
            },
        ];
        for event in events {
            assert_eq!(
                acc.apply(event, &mut renderer).unwrap(),
                TurnProgress::Continue
            );
        }
        let finished = AgentEvent::RunFinished {
            thread_id: "t".to_string(),
            run_id: "r".to_string(),
            result: None,
        };
        assert_eq!(
            acc.apply(finished, &mut renderer).unwrap(),
            TurnProgress::Finished
        );

        let turn = acc.finish();
        assert_eq!(turn.messages.len(), 2);
        assert_eq!(turn.messages[0].role, MessageRole::Tool);
        assert_eq!(turn.messages[0].id, "r1");
        let invocation = turn.messages[0].tool.as_ref().unwrap();
        assert_eq!(invocation.arguments, json!({"palabras": ["v"]}));
        assert_eq!(invocation.result.as_deref(), Some("doc"));
        assert_eq!(turn.messages[1].role, MessageRole::Assistant);
        assert_eq!(turn.messages[1].content, "La velocidad es un vector.");
        assert_eq!(renderer.text, "La velocidad es un vector.");
        assert_eq!(renderer.tools, vec!["buscar_documentos".to_string()]);
    }

    #[test]
    fn empty_messages_are_dropped() {
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(vec![]));
        let mut renderer = Recorder::default();
        acc.apply(
            AgentEvent::TextMessageStart {
                message_id: "m1".to_string(),
                role: None,
            },
            &mut renderer,
        )
        .unwrap();
        acc.apply(content("m1", ""), &mut renderer).unwrap();
        assert!(acc.finish().messages.is_empty());
    }

    #[test]
    fn chunks_open_messages_implicitly() {
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(vec![]));
        let mut renderer = Recorder::default();
        acc.apply(
            AgentEvent::TextMessageChunk {
                message_id: Some("m1".to_string()),
                role: Some("assistant".to_string()),
                delta: Some("Hola".to_string()),
            },
            &mut renderer,
        )
        .unwrap();
        acc.apply(
            AgentEvent::TextMessageChunk {
                message_id: None,
                role: None,
                delta: Some(", ¿qué tal?".to_string()),
            },
            &mut renderer,
        )
        .unwrap();
        acc.apply(
            AgentEvent::ToolCallChunk {
                tool_call_id: Some("c1".to_string()),
                tool_call_name: Some("guardar_interaccion".to_string()),
                parent_message_id: None,
                delta: Some("{}".to_string()),
            },
            &mut renderer,
        )
        .unwrap();

        let turn = acc.finish();
        assert_eq!(turn.messages.len(), 2);
        assert_eq!(turn.messages[0].id, "m1");
        assert_eq!(turn.messages[0].content, "Hola, ¿qué tal?");
        assert_eq!(
            turn.messages[1].tool.as_ref().unwrap().name,
            "guardar_interaccion"
        );
    }

    #[test]
    fn run_without_reply_leaves_a_placeholder() {
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(vec![]));
        let mut renderer = Recorder::default();
        acc.apply(
            AgentEvent::TextMessageStart {
                message_id: "m1".to_string(),
                role: None,
            },
            &mut renderer,
        )
        .unwrap();
        let finished = AgentEvent::RunFinished {
            thread_id: "t".to_string(),
            run_id: "r".to_string(),
            result: None,
        };
        assert_eq!(
            acc.apply(finished, &mut renderer).unwrap(),
            TurnProgress::Finished
        );

        let turn = acc.finish();
        assert_eq!(turn.malformed, 1);
        assert_eq!(turn.messages.len(), 1);
        assert!(turn.messages[0].is_error);
        assert_eq!(turn.messages[0].content, MALFORMED_PLACEHOLDER);
        assert_eq!(renderer.errors.len(), 1);
    }

    #[test]
    fn run_error_fails_the_turn() {
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(vec![]));
        let mut renderer = Recorder::default();
        let err = acc
            .apply(
                AgentEvent::RunError {
                    message: "model overloaded".to_string(),
                    code: None,
                },
                &mut renderer,
            )
            .unwrap_err();
        assert!(matches!(err, Error::AgentRun { .. }));
        assert!(err.is_transport());
    }

    #[test]
    fn malformed_events_leave_placeholders() {
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(vec![]));
        let mut renderer = Recorder::default();
        acc.apply(content("m1", "Primero"), &mut renderer).unwrap();
        acc.malformed(&Error::serialization("bad frame", None), &mut renderer);
        acc.apply(content("m2", "Después"), &mut renderer).unwrap();

        let turn = acc.finish();
        assert_eq!(turn.malformed, 1);
        assert_eq!(turn.messages.len(), 3);
        assert!(turn.messages[1].is_error);
        assert_eq!(turn.messages[1].content, MALFORMED_PLACEHOLDER);
        assert_eq!(renderer.errors.len(), 1);
    }

    #[test]
    fn snapshots_replace_state_and_tracker_sees_order() {
        let steps = vec![
            WorkflowStep::tool("clasificar_consulta", "clasificar"),
            WorkflowStep::respond("responder"),
        ];
        let mut acc = TurnAccumulator::new(WorkflowTracker::new(steps));
        let mut renderer = Recorder::default();
        acc.apply(content("m1", "Respuesta directa"), &mut renderer)
            .unwrap();
        acc.apply(
            AgentEvent::StateSnapshot {
                snapshot: json!({"historial": []}),
            },
            &mut renderer,
        )
        .unwrap();
        acc.apply(
            AgentEvent::StateSnapshot {
                snapshot: json!({"historial": [], "ultimo_tema": "cinemática"}),
            },
            &mut renderer,
        )
        .unwrap();

        let turn = acc.finish();
        assert_eq!(
            turn.agent_state,
            Some(json!({"historial": [], "ultimo_tema": "cinemática"}))
        );
        assert_eq!(
            turn.deviations,
            vec![WorkflowDeviation::Skipped {
                step: "respond".to_string(),
                missing: vec!["clasificar_consulta".to_string()],
            }]
        );
    }
}
