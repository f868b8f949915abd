use std::fmt;

use crate::chat::message::{Message, MessageRole};
use crate::utils::time::clock;

/// The connectivity indicator shown in the header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// The agent is believed reachable.
    #[default]
    Online,
    /// The agent did not answer its health probe.
    Offline,
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("Online"),
            Connectivity::Offline => f.write_str("Offline"),
        }
    }
}

/// A snapshot of everything a chat screen shows.
///
/// Produced by [`ChatSession::render`](crate::chat::ChatSession::render); the
/// `Display` impl lays it out as plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    /// Main header line.
    pub title: String,
    /// Secondary header line.
    pub subtitle: String,
    /// Connectivity indicator.
    pub connectivity: Connectivity,
    /// Context values, in order.
    pub context: Vec<(String, String)>,
    /// Greeting shown before the transcript.
    pub greeting: String,
    /// The transcript.
    pub messages: Vec<Message>,
    /// Footer notes.
    pub footer: Vec<String>,
}

impl fmt::Display for ChatView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header: Vec<&str> = Vec::new();
        if !self.title.is_empty() {
            header.push(&self.title);
        }
        if !self.subtitle.is_empty() {
            header.push(&self.subtitle);
        }
        let connectivity = self.connectivity.to_string();
        header.push(&connectivity);
        writeln!(f, "{}", header.join(" | "))?;
        for (key, value) in &self.context {
            writeln!(f, "  {key}: {value}")?;
        }
        writeln!(f)?;

        if !self.greeting.is_empty() {
            writeln!(f, "assistant: {}", self.greeting)?;
        }
        for message in &self.messages {
            write_message(f, message)?;
        }

        if !self.footer.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", self.footer.join(" • "))?;
        }
        Ok(())
    }
}

fn write_message(f: &mut fmt::Formatter<'_>, message: &Message) -> fmt::Result {
    let at = clock(&message.timestamp);
    if message.is_error {
        return writeln!(f, "[{at}] error: {}", message.content);
    }
    match (message.role, &message.tool) {
        (MessageRole::Tool, Some(invocation)) => {
            writeln!(
                f,
                "[{at}] tool {}({})",
                invocation.name,
                invocation.arguments_text()
            )?;
            if let Some(result) = &invocation.result {
                writeln!(f, "        -> {result}")?;
            }
            Ok(())
        }
        (role, _) => writeln!(f, "[{at}] {role}: {}", message.content),
    }
}
