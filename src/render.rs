//! Output rendering for streamed agent turns.
//!
//! A [`ChatSession`](crate::chat::ChatSession) reports everything it receives
//! during a turn to a [`Renderer`] as it arrives.  [`PlainTextRenderer`] writes
//! it to stdout, optionally styled with ANSI escapes.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// ANSI escape code for dim text (used for tool call ids).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for tool names).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for tool arguments).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for tool results).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for magenta text (used for tool result bodies).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// Trait for rendering streaming output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
pub trait Renderer: Send {
    /// Print a chunk of the agent's answer.
    ///
    /// This is called incrementally as deltas arrive.
    fn print_text(&mut self, text: &str);

    /// Called when the agent starts a tool call, before any arguments arrive.
    fn start_tool_call(&mut self, name: &str, id: &str);

    /// Print a chunk of tool call arguments.
    fn print_tool_args(&mut self, partial_json: &str);

    /// Called when all arguments of the current tool call have arrived.
    fn finish_tool_call(&mut self);

    /// Print the result the agent reported for a tool call.
    fn print_tool_result(&mut self, tool_call_id: &str, content: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a turn's stream is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Called when the turn is interrupted or cancelled.
    fn print_interrupted(&mut self) {}

    /// Returns true if the turn should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    in_tool_args: bool,
    line_start: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            in_tool_args: false,
            line_start: true,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Whether output is styled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn reset_styles(&mut self) {
        if self.in_tool_args {
            if self.use_color {
                print!("{ANSI_RESET}");
            }
            self.in_tool_args = false;
        }
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{text}");
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    /// Starts a fresh line unless already at one.
    fn newline(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.reset_styles();
        self.write(text);
    }

    fn start_tool_call(&mut self, name: &str, id: &str) {
        self.reset_styles();
        self.newline();
        if self.use_color {
            self.write(&format!(
                "{ANSI_CYAN}[tool: {name}]{ANSI_RESET} {ANSI_DIM}({id}){ANSI_RESET}\n{ANSI_YELLOW}"
            ));
            self.in_tool_args = true;
        } else {
            self.write(&format!("[tool: {name}] ({id})\n"));
        }
    }

    fn print_tool_args(&mut self, partial_json: &str) {
        self.write(partial_json);
    }

    fn finish_tool_call(&mut self) {
        self.reset_styles();
        self.newline();
    }

    fn print_tool_result(&mut self, tool_call_id: &str, content: &str) {
        self.reset_styles();
        self.newline();
        if self.use_color {
            self.write(&format!(
                "{ANSI_GREEN}[tool result: {tool_call_id}]{ANSI_RESET}\n{ANSI_MAGENTA}{content}{ANSI_RESET}\n"
            ));
        } else {
            self.write(&format!("[tool result: {tool_call_id}]\n{content}\n"));
        }
    }

    fn print_error(&mut self, error: &str) {
        self.reset_styles();
        self.newline();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.reset_styles();
        self.newline();
        self.write(&format!("{info}\n"));
    }

    fn finish_response(&mut self) {
        self.reset_styles();
        self.newline();
    }

    fn print_interrupted(&mut self) {
        self.reset_styles();
        self.newline();
        self.write("[interrupted]\n");
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
