//! Core chat session management.
//!
//! This module provides [`ChatSession`], the controller that owns a
//! transcript, sends each user message to the agent together with the session's
//! context and instructions, and folds the streamed reply back into the
//! transcript.
//!
//! One turn runs at a time.  A submission that arrives while a turn is awaiting
//! its response is rejected with [`Error::Busy`]: no request is sent and the
//! transcript is not touched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::{AgentBackend, EventStream};
use crate::chat::context::SessionContext;
use crate::chat::instructions::{SystemInstructions, WorkflowDeviation};
use crate::chat::message::{Message, MessageRole};
use crate::chat::profile::{Labels, SessionProfile};
use crate::chat::transcript::Transcript;
use crate::chat::turn::{AccumulatedTurn, TurnAccumulator, TurnProgress};
use crate::chat::view::{ChatView, Connectivity};
use crate::error::{Error, ErrorKind, Result};
use crate::observability::{
    SESSION_MALFORMED, SESSION_REJECTED, SESSION_TURN_DURATION, SESSION_TURNS,
    SESSION_TURNS_CANCELLED, SESSION_TURNS_FAILED, SESSION_WORKFLOW_DEVIATIONS,
};
use crate::types::{RunAgentInput, WireMessage, WireRole};
use crate::Renderer;

/// How often a turn checks for interruption while the agent is silent.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Where the controller is in the life of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    /// Ready for a submission.
    Idle,
    /// A request is in flight.
    AwaitingResponse,
}

/// What a successful turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The run id sent with the request.
    pub run_id: String,
    /// Assistant and tool messages appended after the user message.
    pub messages: Vec<Message>,
    /// How the agent strayed from the prescribed steps.
    pub deviations: Vec<WorkflowDeviation>,
    /// Events that could not be decoded.
    pub malformed_events: usize,
    /// Time from submission to commit.
    pub duration: Duration,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The thread id sent with every request.
    pub thread_id: String,
    /// User messages in the transcript.
    pub user_messages: usize,
    /// Assistant messages in the transcript, not counting errors.
    pub assistant_messages: usize,
    /// Tool messages in the transcript.
    pub tool_messages: usize,
    /// Error-state messages in the transcript.
    pub error_messages: usize,
    /// Turns that committed a reply.
    pub turns_completed: u64,
    /// Turns that failed or were cancelled.
    pub turns_failed: u64,
    /// Submissions refused because a turn was in flight.
    pub rejected_submissions: u64,
    /// Workflow deviations across all turns.
    pub workflow_deviations: u64,
    /// Undecodable events across all turns.
    pub malformed_events: u64,
}

#[derive(Default)]
struct SessionData {
    transcript: Transcript,
    agent_state: Value,
    turns_completed: u64,
    turns_failed: u64,
    rejected: u64,
    deviations: u64,
    malformed: u64,
}

/// Returns the controller to `Idle` however the turn ends.
struct TurnGuard<'a> {
    busy: &'a AtomicBool,
    cancel: &'a Mutex<CancellationToken>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let _token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        self.busy.store(false, Ordering::Release);
    }
}

/// A chat session that manages conversation state and agent interactions.
///
/// The session's context, instructions and labels are fixed at construction.
/// All methods take `&self`; the transcript is guarded internally and never
/// locked across an await.
pub struct ChatSession<B: AgentBackend> {
    backend: B,
    thread_id: String,
    context: SessionContext,
    instructions: SystemInstructions,
    composed: String,
    labels: Labels,
    connectivity: Connectivity,
    busy: AtomicBool,
    cancel: Mutex<CancellationToken>,
    data: Mutex<SessionData>,
}

impl<B: AgentBackend> ChatSession<B> {
    /// Creates a session with the given context and instructions.
    pub fn initialize(
        backend: B,
        context: SessionContext,
        instructions: SystemInstructions,
    ) -> Self {
        let composed = instructions.compose();
        Self {
            backend,
            thread_id: Uuid::new_v4().to_string(),
            context,
            instructions,
            composed,
            labels: Labels::default(),
            connectivity: Connectivity::default(),
            busy: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            data: Mutex::new(SessionData {
                agent_state: Value::Object(serde_json::Map::new()),
                ..SessionData::default()
            }),
        }
    }

    /// Creates a session from a profile.
    pub fn from_profile(backend: B, profile: &SessionProfile) -> Self {
        Self::initialize(
            backend,
            profile.session_context(),
            profile.system_instructions(),
        )
        .with_labels(profile.labels.clone())
    }

    /// Sets the display labels.
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Sets the connectivity indicator.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    fn data(&self) -> MutexGuard<'_, SessionData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends a user message and streams the agent's reply.
    ///
    /// This method:
    /// 1. Appends the user message to the transcript
    /// 2. Sends one request carrying the history, context and instructions
    /// 3. Renders the reply as it arrives
    /// 4. Appends the reply's messages once the run finishes
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `text` is blank.  Nothing changes.
    /// - [`Error::Busy`] if a turn is already in flight.  Nothing changes.
    /// - Any transport error, or [`Error::Abort`] if the turn was cancelled.
    ///   The transcript keeps the user message and gains exactly one
    ///   error-state message; earlier messages are untouched.
    pub async fn submit(&self, text: &str, renderer: &mut dyn Renderer) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation(
                "message is empty",
                Some("text".to_string()),
            ));
        }

        // The gate flips and the turn's token is installed under one lock, so
        // cancel() never sees a busy session holding a stale token.
        let token = {
            let mut current = self.cancel_token();
            if self
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                drop(current);
                SESSION_REJECTED.click();
                self.data().rejected += 1;
                return Err(Error::busy("a reply is still being received"));
            }
            let token = CancellationToken::new();
            *current = token.clone();
            token
        };
        let _guard = TurnGuard {
            busy: &self.busy,
            cancel: &self.cancel,
        };

        SESSION_TURNS.click();
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let input = {
            let mut data = self.data();
            data.transcript.push(Message::user(text));
            self.build_input(&data, &run_id)
        };

        let result = self.run_turn(input, renderer, &token).await;
        let duration = started.elapsed();
        SESSION_TURN_DURATION.add(duration.as_secs_f64());

        match result {
            Ok(turn) => Ok(self.commit(run_id, turn, duration, renderer)),
            Err(err) => {
                if err.kind() == ErrorKind::Cancelled {
                    SESSION_TURNS_CANCELLED.click();
                } else {
                    SESSION_TURNS_FAILED.click();
                }
                tracing::warn!(run_id = %run_id, error = %err, "turn failed");
                let mut data = self.data();
                data.turns_failed += 1;
                data.transcript.push(Message::error(err.to_string()));
                Err(err)
            }
        }
    }

    fn build_input(&self, data: &SessionData, run_id: &str) -> RunAgentInput {
        let mut messages = Vec::with_capacity(data.transcript.len() + 1);
        if !self.composed.is_empty() {
            messages.push(WireMessage::text(
                format!("{}-system", self.thread_id),
                WireRole::System,
                &self.composed,
            ));
        }
        messages.extend(data.transcript.to_wire());
        RunAgentInput::new(
            &self.thread_id,
            run_id,
            messages,
            self.context.to_context_items(),
        )
        .with_state(data.agent_state.clone())
    }

    fn interrupted(&self, token: &CancellationToken, renderer: &dyn Renderer) -> bool {
        token.is_cancelled() || renderer.should_interrupt()
    }

    async fn run_turn(
        &self,
        input: RunAgentInput,
        renderer: &mut dyn Renderer,
        token: &CancellationToken,
    ) -> Result<AccumulatedTurn> {
        let mut accumulator = TurnAccumulator::new(self.instructions.tracker());

        let run = self.backend.run(input);
        tokio::pin!(run);
        let mut events: EventStream = loop {
            if self.interrupted(token, renderer) {
                return Err(cancelled(renderer));
            }
            tokio::select! {
                result = &mut run => break result?,
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(INTERRUPT_POLL) => {}
            }
        };

        loop {
            if self.interrupted(token, renderer) {
                return Err(cancelled(renderer));
            }
            let next = tokio::select! {
                next = events.next() => next,
                _ = token.cancelled() => continue,
                _ = tokio::time::sleep(INTERRUPT_POLL) => continue,
            };
            match next {
                Some(Ok(event)) => {
                    if accumulator.apply(event, renderer)? == TurnProgress::Finished {
                        break;
                    }
                }
                Some(Err(err)) if err.kind() == ErrorKind::MalformedResponse => {
                    SESSION_MALFORMED.click();
                    accumulator.malformed(&err, renderer);
                }
                Some(Err(err)) => return Err(err),
                None => {
                    return Err(Error::streaming(
                        "agent stream ended before the run finished",
                        None,
                    ));
                }
            }
        }

        renderer.finish_response();
        Ok(accumulator.finish())
    }

    fn commit(
        &self,
        run_id: String,
        turn: AccumulatedTurn,
        duration: Duration,
        renderer: &mut dyn Renderer,
    ) -> TurnOutcome {
        for deviation in &turn.deviations {
            SESSION_WORKFLOW_DEVIATIONS.click();
            tracing::warn!(run_id = %run_id, %deviation, "workflow deviation");
            renderer.print_info(&format!("workflow: {deviation}"));
        }

        let mut data = self.data();
        let mut messages = Vec::with_capacity(turn.messages.len());
        for message in turn.messages {
            messages.push(data.transcript.push(message).clone());
        }
        if let Some(state) = turn.agent_state {
            data.agent_state = state;
        }
        data.turns_completed += 1;
        data.deviations += turn.deviations.len() as u64;
        data.malformed += turn.malformed as u64;

        tracing::debug!(
            run_id = %run_id,
            messages = messages.len(),
            elapsed_ms = duration.as_millis() as u64,
            "turn committed"
        );
        TurnOutcome {
            run_id,
            messages,
            deviations: turn.deviations,
            malformed_events: turn.malformed,
            duration,
        }
    }

    /// Cancels the turn in flight, if any.  Returns true if there was one.
    pub fn cancel(&self) -> bool {
        let token = self.cancel_token();
        if !self.busy.load(Ordering::Acquire) {
            return false;
        }
        token.cancel();
        true
    }

    /// A pure projection of the session for display.
    pub fn render(&self) -> ChatView {
        let title = if self.labels.header_title.is_empty() {
            self.labels.title.clone()
        } else {
            self.labels.header_title.clone()
        };
        ChatView {
            title,
            subtitle: self.labels.header_subtitle.clone(),
            connectivity: self.connectivity,
            context: self.context.display_fields(),
            greeting: self.labels.greeting.clone(),
            messages: self.data().transcript.messages().to_vec(),
            footer: self.labels.footer.clone(),
        }
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let data = self.data();
        SessionStats {
            thread_id: self.thread_id.clone(),
            user_messages: data.transcript.count(MessageRole::User),
            assistant_messages: data.transcript.count(MessageRole::Assistant),
            tool_messages: data.transcript.count(MessageRole::Tool),
            error_messages: data.transcript.error_count(),
            turns_completed: data.turns_completed,
            turns_failed: data.turns_failed,
            rejected_submissions: data.rejected,
            workflow_deviations: data.deviations,
            malformed_events: data.malformed,
        }
    }

    /// Where the controller is in the life of a turn.
    pub fn state(&self) -> TurnState {
        if self.busy.load(Ordering::Acquire) {
            TurnState::AwaitingResponse
        } else {
            TurnState::Idle
        }
    }

    /// A copy of the transcript.
    pub fn transcript(&self) -> Transcript {
        self.data().transcript.clone()
    }

    /// The number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.data().transcript.len()
    }

    /// The agent state from the last snapshot.
    pub fn agent_state(&self) -> Value {
        self.data().agent_state.clone()
    }

    /// The session context.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The system instructions.
    pub fn instructions(&self) -> &SystemInstructions {
        &self.instructions
    }

    /// The directive sent as the system message of every request.
    pub fn composed_instructions(&self) -> &str {
        &self.composed
    }

    /// The display labels.
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// The connectivity indicator.
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// The thread id sent with every request.
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

fn cancelled(renderer: &mut dyn Renderer) -> Error {
    renderer.print_interrupted();
    Error::abort("turn cancelled")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentEvent;

    struct Silent;

    #[async_trait::async_trait]
    impl AgentBackend for Silent {
        async fn run(&self, _input: RunAgentInput) -> Result<EventStream> {
            let events = vec![
                Ok(AgentEvent::TextMessageContent {
                    message_id: "m1".to_string(),
                    delta: "ok".to_string(),
                }),
                Ok(AgentEvent::RunFinished {
                    thread_id: "t".to_string(),
                    run_id: "r".to_string(),
                    result: None,
                }),
            ];
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    struct Quiet;

    impl Renderer for Quiet {
        fn print_text(&mut self, _text: &str) {}
        fn start_tool_call(&mut self, _name: &str, _id: &str) {}
        fn print_tool_args(&mut self, _partial_json: &str) {}
        fn finish_tool_call(&mut self) {}
        fn print_tool_result(&mut self, _tool_call_id: &str, _content: &str) {}
        fn print_error(&mut self, _error: &str) {}
        fn print_info(&mut self, _info: &str) {}
        fn finish_response(&mut self) {}
    }

    #[test]
    fn new_session_is_idle_and_empty() {
        let session = ChatSession::from_profile(Silent, &SessionProfile::builtin());
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.message_count(), 0);
        assert!(!session.cancel());
        assert_eq!(session.connectivity(), Connectivity::Online);
        assert!(session
            .composed_instructions()
            .contains("Recuerda siempre:"));
    }

    #[test]
    fn input_starts_with_system_directive() {
        let session = ChatSession::from_profile(Silent, &SessionProfile::builtin());
        let input = {
            let mut data = session.data();
            data.transcript.push(Message::user("hola"));
            session.build_input(&data, "run-1")
        };
        assert_eq!(input.thread_id, session.thread_id());
        assert_eq!(input.run_id, "run-1");
        assert_eq!(input.messages.len(), 2);
        assert_eq!(input.messages[0].role, WireRole::System);
        assert_eq!(
            input.messages[0].content.as_deref(),
            Some(session.composed_instructions())
        );
        assert_eq!(input.messages[1].role, WireRole::User);
        assert_eq!(input.context.len(), 1);
        assert!(input.tools.is_empty());
    }

    #[test]
    fn empty_instructions_send_no_system_message() {
        let session = ChatSession::initialize(
            Silent,
            SessionContext::empty(),
            SystemInstructions::empty(),
        );
        let input = session.build_input(&session.data(), "run-1");
        assert!(input.messages.is_empty());
        assert!(input.context.is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_side_effects() {
        let session = ChatSession::from_profile(Silent, &SessionProfile::builtin());
        let err = session.submit("   ", &mut Quiet).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.stats().turns_completed, 0);
    }

    #[tokio::test]
    async fn submit_appends_user_then_reply() {
        let session = ChatSession::from_profile(Silent, &SessionProfile::builtin());
        let outcome = session.submit("hola", &mut Quiet).await.unwrap();
        assert_eq!(outcome.messages.len(), 1);
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].role, MessageRole::User);
        assert_eq!(transcript.messages()[1].content, "ok");
        assert_eq!(session.state(), TurnState::Idle);
    }
}
