//! Interactive chat with a course assistant agent.
//!
//! This binary provides a streaming REPL interface to an agent that speaks the
//! AG-UI protocol, configured by default for the Física I assistant of the
//! Universidad de Buenos Aires.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with the agent on http://localhost:8000/
//! aula-chat
//!
//! # Point at another agent
//! aula-chat --agent-url http://agents.example.com/fisica/
//!
//! # Use a different session profile
//! aula-chat --profile profiles/fisica-uba.yaml
//!
//! # Record every request and event
//! aula-chat --log-events events.jsonl
//! ```
//!
//! Set `AULA_LOG=debug` to see diagnostic logging on stderr.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start over with an empty transcript
//! - `/state` - Show the agent state
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use aula::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, Connectivity, PlainTextRenderer, Renderer,
    SessionProfile, help_text, parse_command,
};
use aula::{AgentClient, ErrorKind};

/// Main entry point for the aula-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (args, _) = ChatArgs::from_command_line_relaxed("aula-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer =
        PlainTextRenderer::with_color(config.use_color).with_interrupt(interrupted.clone());

    let (profile, profile_error) = config.load_profile();
    if let Some(err) = profile_error {
        renderer.print_error(&format!("{err}; continuing with an empty profile"));
    }

    let client = config.build_client()?;
    let connectivity = if config.health_check {
        probe(&client, &mut renderer).await
    } else {
        Connectivity::Online
    };
    let mut session = ChatSession::from_profile(client, &profile).with_connectivity(connectivity);
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    print_banner(&session, &profile);

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("¡Hasta luego!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::New => {
                            let client = session.backend().clone();
                            session = ChatSession::from_profile(client, &profile)
                                .with_connectivity(session.connectivity());
                            renderer.print_info("Started a new conversation.");
                        }
                        ChatCommand::Context => {
                            let context = session.context();
                            println!("    {}:", display_or(context.description(), "Context"));
                            if context.is_empty() {
                                println!("      (none)");
                            }
                            for (key, value) in context.display_fields() {
                                println!("      {key}: {value}");
                            }
                        }
                        ChatCommand::Instructions => {
                            let composed = session.composed_instructions();
                            for line in display_or(composed, "(none)").lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::State => {
                            match serde_json::to_string_pretty(&session.agent_state()) {
                                Ok(state) => {
                                    for line in state.lines() {
                                        println!("    {}", line);
                                    }
                                }
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Health => {
                            if probe(session.backend(), &mut renderer).await == Connectivity::Online
                            {
                                renderer.print_info("Agent is healthy.");
                            }
                        }
                        ChatCommand::Info => match session.backend().info().await {
                            Ok(info) => {
                                println!("    {}", display_or(&info.name, "(unnamed agent)"));
                                if !info.description.is_empty() {
                                    println!("      {}", info.description);
                                }
                                for feature in &info.features {
                                    println!("      feature: {feature}");
                                }
                                for tool in &info.tools {
                                    println!("      tool: {tool}");
                                }
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::View => {
                            print!("{}", session.render());
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the agent
                if let Err(err) = session.submit(line, &mut renderer).await {
                    match err.kind() {
                        // print_interrupted already reported it
                        ErrorKind::Cancelled => {}
                        _ => renderer.print_error(&err.to_string()),
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\n¡Hasta luego!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so they never interleave with the transcript on stdout.
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("AULA_LOG")
                .unwrap_or_else(|_| "aula=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn probe(client: &AgentClient, renderer: &mut PlainTextRenderer) -> Connectivity {
    match client.health().await {
        Ok(health) if health.is_healthy() => {
            tracing::debug!(agent = ?health.agent, model = ?health.model, "agent healthy");
            Connectivity::Online
        }
        Ok(health) => {
            renderer.print_error(&format!(
                "agent at {} reports status '{}'",
                client.agent_url(),
                health.status
            ));
            Connectivity::Offline
        }
        Err(err) => {
            renderer.print_error(&format!(
                "agent at {} is not reachable: {err}",
                client.agent_url()
            ));
            Connectivity::Offline
        }
    }
}

fn print_banner(session: &ChatSession<AgentClient>, profile: &SessionProfile) {
    let view = session.render();
    let mut header = vec![display_or(&view.title, "aula").to_string()];
    if !view.subtitle.is_empty() {
        header.push(view.subtitle.clone());
    }
    header.push(view.connectivity.to_string());
    println!("{}", header.join(" | "));
    if !view.greeting.is_empty() {
        println!("\n{}\n", view.greeting);
    }
    if !profile.labels.placeholder.is_empty() {
        println!("{}", profile.labels.placeholder);
    }
    println!("Type /help for commands, /quit to exit\n");
}

fn print_stats(session: &ChatSession<AgentClient>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Agent: {}", session.backend().agent_url());
    println!("      Thread: {}", stats.thread_id);
    println!(
        "      Messages: {} user / {} assistant / {} tool / {} error",
        stats.user_messages, stats.assistant_messages, stats.tool_messages, stats.error_messages
    );
    println!(
        "      Turns: {} completed / {} failed",
        stats.turns_completed, stats.turns_failed
    );
    println!("      Rejected submissions: {}", stats.rejected_submissions);
    println!("      Workflow deviations: {}", stats.workflow_deviations);
    println!("      Malformed events: {}", stats.malformed_events);
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
