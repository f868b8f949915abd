use serde::{Deserialize, Serialize};

/// A piece of readable context shared with the agent on every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextItem {
    /// What the value describes.
    pub description: String,

    /// The value itself, as text.
    pub value: String,
}

impl ContextItem {
    /// Creates a new context item.
    pub fn new(description: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            value: value.into(),
        }
    }
}
