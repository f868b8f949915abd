use serde_json::{Map, Value};

use crate::types::ContextItem;

/// Fixed metadata attached to every request of a session.
///
/// Built once, then handed to [`ChatSession`](crate::chat::ChatSession), which
/// only ever reads it.  Keys keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    description: String,
    values: Map<String, Value>,
}

impl SessionContext {
    /// Creates a context with a description and no values.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            values: Map::new(),
        }
    }

    /// The empty context used when configuration is missing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a context from a description and an existing map.
    pub fn from_map(description: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            description: description.into(),
            values,
        }
    }

    /// Adds or replaces a value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// What the context describes, e.g. "Información del estudiante".
    pub fn description(&self) -> &str {
        &self.description
    }

    /// All values, in insertion order.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Looks up one value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Looks up one value that is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// True if there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The context as sent to the agent: one item whose value is the
    /// JSON-encoded map, or nothing when the context is empty.
    pub fn to_context_items(&self) -> Vec<ContextItem> {
        if self.values.is_empty() {
            return Vec::new();
        }
        let value = Value::Object(self.values.clone()).to_string();
        vec![ContextItem::new(&self.description, value)]
    }

    /// Key/value pairs for display.  Strings are shown without quotes.
    pub fn display_fields(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fisica() -> SessionContext {
        SessionContext::new("Información del estudiante")
            .with_value("curso", "Física I")
            .with_value("universidad", "Universidad de Buenos Aires")
    }

    #[test]
    fn context_item_carries_json_map() {
        let items = fisica().to_context_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Información del estudiante");
        assert_eq!(
            items[0].value,
            r#"{"curso":"Física I","universidad":"Universidad de Buenos Aires"}"#
        );
    }

    #[test]
    fn empty_context_sends_nothing() {
        assert!(SessionContext::empty().to_context_items().is_empty());
    }

    #[test]
    fn display_fields_keep_order() {
        let context = fisica().with_value("cuatrimestre", 2);
        assert_eq!(
            context.display_fields(),
            vec![
                ("curso".to_string(), "Física I".to_string()),
                (
                    "universidad".to_string(),
                    "Universidad de Buenos Aires".to_string()
                ),
                ("cuatrimestre".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(context.get_str("curso"), Some("Física I"));
    }
}
