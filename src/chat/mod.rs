//! Chat sessions with an educational assistant agent.
//!
//! This module provides the session controller and everything around it:
//!
//! - Streaming replies with live rendering of text and tool calls
//! - A fixed context and instruction set per session, loaded from a profile
//! - Detection of replies that stray from the prescribed tool order
//! - Slash commands and CLI configuration for the `aula-chat` binary
//!
//! # Architecture
//!
//! - [`session`]: [`ChatSession`], the controller that owns the transcript
//! - [`turn`]: folds one run's events into messages
//! - [`instructions`]: instruction text and the [`WorkflowTracker`]
//! - [`profile`]: [`SessionProfile`] loading
//! - [`view`]: the [`ChatView`] projection
//! - [`commands`]: slash command parsing
//! - [`config`]: CLI argument parsing and configuration

pub mod commands;
pub mod config;
pub mod context;
pub mod instructions;
pub mod message;
pub mod profile;
pub mod session;
pub mod transcript;
pub mod turn;
pub mod view;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use context::SessionContext;
pub use instructions::{SystemInstructions, WorkflowDeviation, WorkflowStep, WorkflowTracker};
pub use message::{Message, MessageRole, ToolInvocation};
pub use profile::{Labels, SessionProfile};
pub use session::{ChatSession, SessionStats, TurnOutcome, TurnState};
pub use transcript::Transcript;
pub use turn::{AccumulatedTurn, MALFORMED_PLACEHOLDER, TurnAccumulator, TurnProgress};
pub use view::{ChatView, Connectivity};
