//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to inspect and control the chat session without sending
//! messages to the agent.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Start a new session with an empty transcript.
    New,

    /// Show the session context.
    Context,

    /// Show the composed system instructions.
    Instructions,

    /// Show the agent state from the last snapshot.
    State,

    /// Display session statistics.
    Stats,

    /// Probe the agent's health endpoint.
    Health,

    /// Show the agent's self-description.
    Info,

    /// Redraw the whole chat view.
    View,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use aula::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/state").is_some());
/// assert!(parse_command("¿Qué es la aceleración?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "new" | "reset" => ChatCommand::New,
        "context" => ChatCommand::Context,
        "instructions" | "system" => ChatCommand::Instructions,
        "state" => ChatCommand::State,
        "stats" | "status" => ChatCommand::Stats,
        "health" => ChatCommand::Health,
        "info" => ChatCommand::Info,
        "view" => ChatCommand::View,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    if let Some(argument) = argument
        && !matches!(result, ChatCommand::Invalid(_))
    {
        return Some(ChatCommand::Invalid(format!(
            "/{command} takes no argument (got '{argument}')"
        )));
    }

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start over with an empty transcript
  /context               Show the context sent with every message
  /instructions          Show the instructions sent to the agent
  /state                 Show the agent state from the last reply
  /stats                 Show session statistics
  /health                Check whether the agent is reachable
  /info                  Show what the agent says about itself
  /view                  Redraw the whole conversation
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_session_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/RESET"), Some(ChatCommand::New));
        assert_eq!(parse_command("/context"), Some(ChatCommand::Context));
        assert_eq!(
            parse_command("/instructions"),
            Some(ChatCommand::Instructions)
        );
        assert_eq!(parse_command("/state"), Some(ChatCommand::State));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/view"), Some(ChatCommand::View));
    }

    #[test]
    fn parse_agent_commands() {
        assert_eq!(parse_command("/health"), Some(ChatCommand::Health));
        assert_eq!(parse_command("/info"), Some(ChatCommand::Info));
    }

    #[test]
    fn arguments_are_rejected() {
        assert!(matches!(
            parse_command("/stats now"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("takes no argument")
        ));
    }

    #[test]
    fn unknown_commands() {
        assert_eq!(
            parse_command("/model gpt"),
            Some(ChatCommand::Invalid("Unknown command: /model".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("¿Qué es la energía cinética?"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(!help.is_empty());
        assert!(help.contains("/quit"));
        assert!(help.contains("/new"));
        assert!(help.contains("/state"));
    }
}
