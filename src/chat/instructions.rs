//! System instructions and the tool-ordering workflow they prescribe.
//!
//! The agent is asked, in prose, to call its tools in a fixed order.  The
//! client cannot make it comply, but it can watch: [`WorkflowTracker`] follows
//! the tool calls and replies of one run and records every point where the
//! agent strayed from the prescribed order.

use std::fmt;

use serde::{Deserialize, Serialize};

const REMINDER_HEADER: &str = "Recuerda siempre:";

/// One prescribed step of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Tool the agent must call, or `None` for the written answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// The line that tells the agent what to do.
    pub directive: String,
}

impl WorkflowStep {
    /// A step that calls `tool`.
    pub fn tool(tool: impl Into<String>, directive: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.into()),
            directive: directive.into(),
        }
    }

    /// The step where the agent writes its answer.
    pub fn respond(directive: impl Into<String>) -> Self {
        Self {
            tool: None,
            directive: directive.into(),
        }
    }

    /// The tool name, or "respond".
    pub fn label(&self) -> &str {
        self.tool.as_deref().unwrap_or("respond")
    }
}

/// Base instruction text plus the ordered steps every turn must follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInstructions {
    base: String,
    steps: Vec<WorkflowStep>,
}

impl SystemInstructions {
    /// Creates instructions from base text and steps.
    pub fn new(base: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            base: base.into(),
            steps,
        }
    }

    /// Instructions with no text and no steps.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The base text.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The prescribed steps, in order.
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// True if there is neither text nor steps.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.steps.is_empty()
    }

    /// The directive sent to the agent: base text, then a numbered reminder
    /// of the steps.
    pub fn compose(&self) -> String {
        if self.steps.is_empty() {
            return self.base.clone();
        }
        let mut out = String::new();
        if !self.base.is_empty() {
            out.push_str(&self.base);
            out.push_str("\n\n");
        }
        out.push_str(REMINDER_HEADER);
        for (idx, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", idx + 1, step.directive));
        }
        out
    }

    /// A fresh tracker for one run.
    pub fn tracker(&self) -> WorkflowTracker {
        WorkflowTracker::new(self.steps.clone())
    }
}

/// A departure from the prescribed step order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowDeviation {
    /// `step` ran before the steps that should precede it.
    Skipped {
        /// The step that ran.
        step: String,
        /// The steps it jumped over.
        missing: Vec<String>,
    },

    /// `step` ran again after the workflow had moved past it.
    OutOfOrder {
        /// The step that ran.
        step: String,
        /// The latest step completed before it.
        after: String,
    },

    /// The run finished before these steps ran.
    Incomplete {
        /// The steps that never ran.
        missing: Vec<String>,
    },
}

impl fmt::Display for WorkflowDeviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowDeviation::Skipped { step, missing } => {
                write!(f, "{step} ran before {}", missing.join(", "))
            }
            WorkflowDeviation::OutOfOrder { step, after } => {
                write!(f, "{step} ran again after {after}")
            }
            WorkflowDeviation::Incomplete { missing } => {
                write!(f, "run finished without {}", missing.join(", "))
            }
        }
    }
}

/// Follows one run against the prescribed steps.
#[derive(Debug, Clone)]
pub struct WorkflowTracker {
    steps: Vec<WorkflowStep>,
    next: usize,
    deviations: Vec<WorkflowDeviation>,
}

impl WorkflowTracker {
    /// Creates a tracker positioned before the first step.
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self {
            steps,
            next: 0,
            deviations: Vec::new(),
        }
    }

    /// Records that the agent called `tool`.  Unlisted tools are ignored.
    pub fn observe_tool(&mut self, tool: &str) {
        if let Some(idx) = self
            .steps
            .iter()
            .position(|step| step.tool.as_deref() == Some(tool))
        {
            self.advance(idx);
        }
    }

    /// Records that the agent wrote answer text.
    pub fn observe_response(&mut self) {
        if let Some(idx) = self.steps.iter().position(|step| step.tool.is_none()) {
            self.advance(idx);
        }
    }

    fn advance(&mut self, idx: usize) {
        if idx >= self.next {
            if idx > self.next {
                self.deviations.push(WorkflowDeviation::Skipped {
                    step: self.steps[idx].label().to_string(),
                    missing: self.labels(self.next..idx),
                });
            }
            self.next = idx + 1;
        } else if idx + 1 != self.next {
            // Repeating the step just completed is fine; going further back is not.
            self.deviations.push(WorkflowDeviation::OutOfOrder {
                step: self.steps[idx].label().to_string(),
                after: self.steps[self.next - 1].label().to_string(),
            });
        }
    }

    fn labels(&self, range: std::ops::Range<usize>) -> Vec<String> {
        self.steps[range]
            .iter()
            .map(|step| step.label().to_string())
            .collect()
    }

    /// Deviations recorded so far.
    pub fn deviations(&self) -> &[WorkflowDeviation] {
        &self.deviations
    }

    /// Ends the run, recording any steps that never ran.
    pub fn finish(mut self) -> Vec<WorkflowDeviation> {
        if self.next < self.steps.len() {
            let missing = self.labels(self.next..self.steps.len());
            self.deviations.push(WorkflowDeviation::Incomplete { missing });
        }
        self.deviations
    }
}
