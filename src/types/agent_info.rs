use serde::{Deserialize, Serialize};

/// Answer of the agent's health probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HealthStatus {
    /// "healthy" when the agent is ready.
    pub status: String,

    /// Name of the agent.
    #[serde(default)]
    pub agent: Option<String>,

    /// Model backing the agent.
    #[serde(default)]
    pub model: Option<String>,
}

impl HealthStatus {
    /// Returns true if the agent reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

/// Self-description published by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentInfo {
    /// Display name.
    #[serde(default)]
    pub name: String,

    /// One-line description.
    #[serde(default)]
    pub description: String,

    /// Advertised features.
    #[serde(default)]
    pub features: Vec<String>,

    /// Advertised tools, one per line.
    #[serde(default)]
    pub tools: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_from_agent() {
        let json = r#"{"status":"healthy","agent":"AsistenteFisica","model":"gemini-2.5-flash"}"#;
        let health: HealthStatus = serde_json::from_str(json).unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.agent.as_deref(), Some("AsistenteFisica"));
    }

    #[test]
    fn info_tolerates_missing_fields() {
        let info: AgentInfo = serde_json::from_str(r#"{"name":"Asistente"}"#).unwrap();
        assert_eq!(info.name, "Asistente");
        assert!(info.features.is_empty());
        assert!(info.tools.is_empty());
    }
}
