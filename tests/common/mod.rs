//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream;
use serde_json::Value;
use tokio::sync::Notify;

use aula::{AgentBackend, AgentEvent, Error, EventStream, Renderer, Result, RunAgentInput};

/// Renderer that remembers what it was asked to show.
#[derive(Default)]
pub struct Recorder {
    pub text: String,
    pub tool_calls: Vec<String>,
    pub tool_results: Vec<String>,
    pub errors: Vec<String>,
    pub info: Vec<String>,
    pub finished: usize,
    pub interrupted: usize,
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Recorder {
    pub fn with_interrupt(flag: Arc<AtomicBool>) -> Self {
        Self {
            interrupt: Some(flag),
            ..Self::default()
        }
    }
}

impl Renderer for Recorder {
    fn print_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn start_tool_call(&mut self, name: &str, _id: &str) {
        self.tool_calls.push(name.to_string());
    }

    fn print_tool_args(&mut self, _partial_json: &str) {}

    fn finish_tool_call(&mut self) {}

    fn print_tool_result(&mut self, _tool_call_id: &str, content: &str) {
        self.tool_results.push(content.to_string());
    }

    fn print_error(&mut self, error: &str) {
        self.errors.push(error.to_string());
    }

    fn print_info(&mut self, info: &str) {
        self.info.push(info.to_string());
    }

    fn finish_response(&mut self) {
        self.finished += 1;
    }

    fn print_interrupted(&mut self) {
        self.interrupted += 1;
    }

    fn should_interrupt(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// One item of a scripted reply.
pub enum Step {
    Event(AgentEvent),
    Fail(Error),
    /// Blocks the stream until the gate is notified.
    Wait(Arc<Notify>),
}

/// How the backend answers one run.
pub enum Script {
    Refuse(Error),
    Reply(Vec<Step>),
}

/// Backend that answers runs from a queue of scripts and records every input.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<RunAgentInput>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn reply(&self, events: Vec<AgentEvent>) {
        self.push(Script::Reply(events.into_iter().map(Step::Event).collect()));
    }

    pub fn requests(&self) -> Vec<RunAgentInput> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AgentBackend for ScriptedBackend {
    async fn run(&self, input: RunAgentInput) -> Result<EventStream> {
        self.requests.lock().unwrap().push(input);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("no script left for this run");
        match script {
            Script::Refuse(err) => Err(err),
            Script::Reply(steps) => {
                let events = stream::unfold(steps.into_iter(), |mut steps| async move {
                    loop {
                        match steps.next()? {
                            Step::Event(event) => return Some((Ok(event), steps)),
                            Step::Fail(err) => return Some((Err(err), steps)),
                            Step::Wait(gate) => gate.notified().await,
                        }
                    }
                });
                Ok(Box::pin(events))
            }
        }
    }
}

pub fn started() -> AgentEvent {
    AgentEvent::RunStarted {
        thread_id: "thread".to_string(),
        run_id: "run".to_string(),
    }
}

pub fn finished() -> AgentEvent {
    AgentEvent::RunFinished {
        thread_id: "thread".to_string(),
        run_id: "run".to_string(),
        result: None,
    }
}

pub fn text(message_id: &str, delta: &str) -> AgentEvent {
    AgentEvent::TextMessageContent {
        message_id: message_id.to_string(),
        delta: delta.to_string(),
    }
}

pub fn tool(call_id: &str, name: &str, args: &str, result: &str) -> Vec<AgentEvent> {
    vec![
        AgentEvent::ToolCallStart {
            tool_call_id: call_id.to_string(),
            tool_call_name: name.to_string(),
            parent_message_id: None,
        },
        AgentEvent::ToolCallArgs {
            tool_call_id: call_id.to_string(),
            delta: args.to_string(),
        },
        AgentEvent::ToolCallEnd {
            tool_call_id: call_id.to_string(),
        },
        AgentEvent::ToolCallResult {
            message_id: None,
            tool_call_id: call_id.to_string(),
            content: result.to_string(),
            role: Some("tool".to_string()),
        },
    ]
}

pub fn snapshot(state: Value) -> AgentEvent {
    AgentEvent::StateSnapshot { snapshot: state }
}

/// A complete, well-ordered reply to a physics question.
pub fn prescribed_reply(answer: &str) -> Vec<AgentEvent> {
    let mut events = vec![started()];
    events.extend(tool(
        "c1",
        "clasificar_consulta",
        r#"{"consulta":"cinemática"}"#,
        "teoría",
    ));
    events.extend(tool(
        "c2",
        "buscar_documentos",
        r#"{"palabras_clave":["cinemática"]}"#,
        "Apunte 1: movimiento rectilíneo",
    ));
    events.push(text("m1", answer));
    events.extend(tool("c3", "guardar_interaccion", "{}", "ok"));
    events.push(finished());
    events
}
