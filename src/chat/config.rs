//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::chat::profile::SessionProfile;
use crate::client_logger::JsonlClientLogger;
use crate::{AgentClient, Error, Result};

/// Default time limit for one turn.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Command-line arguments for the aula-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Agent endpoint.
    #[arrrg(
        optional,
        "Agent URL (default: $AULA_AGENT_URL or http://localhost:8000/)",
        "URL"
    )]
    pub agent_url: Option<String>,

    /// Session profile to load.
    #[arrrg(optional, "YAML session profile (default: built-in Física I)", "FILE")]
    pub profile: Option<String>,

    /// Time limit for one turn, in seconds.
    #[arrrg(optional, "Seconds to wait for a reply (default: 300)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// File that receives every request and event as JSON lines.
    #[arrrg(optional, "Append requests and events to this JSONL file", "FILE")]
    pub log_events: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Skip the health probe at startup.
    #[arrrg(flag, "Do not probe the agent at startup")]
    pub no_health_check: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Agent endpoint; `None` defers to the environment and then the default.
    pub agent_url: Option<String>,

    /// Session profile path; `None` uses the built-in profile.
    pub profile_path: Option<PathBuf>,

    /// Time limit for one turn.
    pub timeout: Duration,

    /// Where to log requests and events, if anywhere.
    pub event_log: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to probe the agent's health at startup.
    pub health_check: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Agent URL: from the environment, else http://localhost:8000/
    /// - Profile: built-in
    /// - Timeout: 300 seconds
    /// - Color: enabled
    /// - Health check: enabled
    pub fn new() -> Self {
        Self {
            agent_url: None,
            profile_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            event_log: None,
            use_color: true,
            health_check: true,
        }
    }

    /// Sets the agent endpoint.
    pub fn with_agent_url(mut self, url: impl Into<String>) -> Self {
        self.agent_url = Some(url.into());
        self
    }

    /// Sets the profile path.
    pub fn with_profile_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.profile_path = Some(path.into());
        self
    }

    /// Sets the turn timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the event log path.
    pub fn with_event_log(mut self, path: Option<PathBuf>) -> Self {
        self.event_log = path;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Disables the startup health probe.
    pub fn without_health_check(mut self) -> Self {
        self.health_check = false;
        self
    }

    /// Loads the configured profile.
    ///
    /// Without a path this is the built-in profile.  With one, a read or parse
    /// failure yields the empty profile and the error that caused it.
    pub fn load_profile(&self) -> (SessionProfile, Option<Error>) {
        match &self.profile_path {
            Some(path) => SessionProfile::load_or_default(path),
            None => (SessionProfile::builtin(), None),
        }
    }

    /// Builds the agent client, attaching the event log if one is configured.
    pub fn build_client(&self) -> Result<AgentClient> {
        let client = AgentClient::with_options(self.agent_url.clone(), Some(self.timeout))?;
        match &self.event_log {
            Some(path) => {
                let logger = JsonlClientLogger::open(path)?;
                Ok(client.with_logger(Arc::new(logger)))
            }
            None => Ok(client),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            agent_url: args.agent_url,
            profile_path: args.profile.map(PathBuf::from),
            timeout: Duration::from_secs(args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            event_log: args.log_events.map(PathBuf::from),
            use_color: !args.no_color,
            health_check: !args.no_health_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.agent_url.is_none());
        assert!(config.profile_path.is_none());
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert!(config.event_log.is_none());
        assert!(config.use_color);
        assert!(config.health_check);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            agent_url: Some("http://agent.local:9000/".to_string()),
            profile: Some("profiles/fisica-uba.yaml".to_string()),
            timeout_secs: Some(45),
            log_events: Some("events.jsonl".to_string()),
            no_color: true,
            no_health_check: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.agent_url.as_deref(), Some("http://agent.local:9000/"));
        assert_eq!(
            config.profile_path,
            Some(PathBuf::from("profiles/fisica-uba.yaml"))
        );
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.event_log, Some(PathBuf::from("events.jsonl")));
        assert!(!config.use_color);
        assert!(!config.health_check);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_agent_url("http://127.0.0.1:8000/")
            .with_profile_path("custom.yaml")
            .with_timeout(Duration::from_secs(10))
            .with_event_log(Some(PathBuf::from("log.jsonl")))
            .without_color()
            .without_health_check();
        assert_eq!(config.agent_url.as_deref(), Some("http://127.0.0.1:8000/"));
        assert_eq!(config.profile_path, Some(PathBuf::from("custom.yaml")));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.event_log, Some(PathBuf::from("log.jsonl")));
        assert!(!config.use_color);
        assert!(!config.health_check);
    }

    #[test]
    fn profile_defaults_to_builtin() {
        let (profile, err) = ChatConfig::new().load_profile();
        assert!(err.is_none());
        assert_eq!(profile, SessionProfile::builtin());
    }

    #[test]
    fn client_uses_configured_url_and_timeout() {
        let client = ChatConfig::new()
            .with_agent_url("http://127.0.0.1:8123")
            .with_timeout(Duration::from_secs(7))
            .build_client()
            .unwrap();
        assert_eq!(client.agent_url().as_str(), "http://127.0.0.1:8123/");
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }
}
