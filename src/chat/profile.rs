//! Session profiles: everything that configures one kind of chat.
//!
//! A profile bundles the [`SessionContext`], the [`SystemInstructions`] and the
//! display [`Labels`] of a session.  Profiles are read from YAML; every field
//! may be omitted and defaults to empty.
//!
//! ```yaml
//! description: Información del estudiante
//! context:
//!   curso: Física I
//!   universidad: Universidad de Buenos Aires
//! instructions: Eres un profesor experto en Física I.
//! steps:
//!   - tool: clasificar_consulta
//!     directive: Usa la herramienta 'clasificar_consulta' primero
//!   - directive: Responde basándote en los documentos encontrados
//! labels:
//!   title: Asistente de Física
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::context::SessionContext;
use crate::chat::instructions::{SystemInstructions, WorkflowStep};
use crate::{Error, Result};

/// Display text for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Title of the chat panel.
    pub title: String,
    /// Greeting shown before the first message.
    pub greeting: String,
    /// Hint shown where the student types.
    pub placeholder: String,
    /// Main header line.
    pub header_title: String,
    /// Secondary header line.
    pub header_subtitle: String,
    /// Footer notes.
    pub footer: Vec<String>,
}

/// Context, instructions and labels for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionProfile {
    /// Description of the context values.
    pub description: String,
    /// Context values sent with every request.
    pub context: Map<String, Value>,
    /// Base instruction text.
    pub instructions: String,
    /// Prescribed steps, in order.
    pub steps: Vec<WorkflowStep>,
    /// Display text.
    pub labels: Labels,
}

impl SessionProfile {
    /// The profile with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The Física I profile of the Universidad de Buenos Aires.
    pub fn builtin() -> Self {
        let mut context = Map::new();
        context.insert("curso".to_string(), Value::from("Física I"));
        context.insert(
            "universidad".to_string(),
            Value::from("Universidad de Buenos Aires"),
        );
        Self {
            description: "Información del estudiante".to_string(),
            context,
            instructions: "Eres un profesor experto en Física I de la Universidad de Buenos Aires. \
                Siempre usa las herramientas disponibles para clasificar consultas, \
                buscar en documentos relevantes y proporcionar respuestas precisas y didácticas \
                basadas en el material del curso."
                .to_string(),
            steps: vec![
                WorkflowStep::tool(
                    "clasificar_consulta",
                    "Usa la herramienta 'clasificar_consulta' primero",
                ),
                WorkflowStep::tool(
                    "buscar_documentos",
                    "Luego usa 'buscar_documentos' con palabras clave relevantes",
                ),
                WorkflowStep::respond("Responde basándote en los documentos encontrados"),
                WorkflowStep::tool(
                    "guardar_interaccion",
                    "Al final, usa 'guardar_interaccion' para registrar la conversación",
                ),
            ],
            labels: Labels {
                title: "Asistente de Física".to_string(),
                greeting: "¡Hola! 👋 Soy tu asistente de Física I de la UBA.\n\n\
                    Puedo ayudarte con:\n\
                    • Cinemática y Dinámica\n\
                    • Trabajo y Energía\n\
                    • Ondas y Sonido\n\
                    • Mecánica de Fluidos\n\n\
                    ¿Qué tema te gustaría estudiar hoy?"
                    .to_string(),
                placeholder: "Pregunta sobre física...".to_string(),
                header_title: "Asistente de Física I".to_string(),
                header_subtitle: "Universidad de Buenos Aires".to_string(),
                footer: vec![
                    "💡 Sistema RAG con Google ADK".to_string(),
                    "Basado en documentos del curso".to_string(),
                    "Conectado".to_string(),
                ],
            },
        }
    }

    /// Parses a profile from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        serde_yaml::from_str(text).map_err(|err| {
            Error::configuration(format!("invalid profile: {err}"), Some(Box::new(err)))
        })
    }

    /// Reads a profile from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::configuration(
                format!("cannot read profile {}: {err}", path.display()),
                Some(Box::new(err)),
            )
        })?;
        Self::from_yaml(&text)
    }

    /// Reads a profile, falling back to [`SessionProfile::empty`].
    ///
    /// The error that caused the fallback, if any, is returned alongside so the
    /// caller can report it.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<Error>) {
        match Self::load(path) {
            Ok(profile) => (profile, None),
            Err(err) => {
                tracing::warn!(error = %err, "using empty session profile");
                (Self::empty(), Some(err))
            }
        }
    }

    /// The session context this profile describes.
    pub fn session_context(&self) -> SessionContext {
        SessionContext::from_map(&self.description, self.context.clone())
    }

    /// The system instructions this profile describes.
    pub fn system_instructions(&self) -> SystemInstructions {
        SystemInstructions::new(&self.instructions, self.steps.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn builtin_composes_reminder() {
        let composed = SessionProfile::builtin().system_instructions().compose();
        assert!(composed.starts_with("Eres un profesor experto en Física I"));
        assert!(composed.ends_with(
            "\n\nRecuerda siempre:\n\
             1. Usa la herramienta 'clasificar_consulta' primero\n\
             2. Luego usa 'buscar_documentos' con palabras clave relevantes\n\
             3. Responde basándote en los documentos encontrados\n\
             4. Al final, usa 'guardar_interaccion' para registrar la conversación"
        ));
    }

    #[test]
    fn bundled_profile_matches_builtin() {
        let bundled = SessionProfile::from_yaml(include_str!("../../profiles/fisica-uba.yaml"))
            .unwrap();
        assert_eq!(bundled, SessionProfile::builtin());
    }

    #[test]
    fn omitted_fields_default_to_empty() {
        let profile = SessionProfile::from_yaml("context:\n  curso: Química\n").unwrap();
        assert_eq!(profile.session_context().get_str("curso"), Some("Química"));
        assert!(profile.instructions.is_empty());
        assert!(profile.steps.is_empty());
        assert_eq!(profile.labels, Labels::default());

        assert_eq!(SessionProfile::from_yaml("").unwrap(), SessionProfile::empty());
    }

    #[test]
    fn invalid_yaml_is_configuration_error() {
        let err = SessionProfile::from_yaml("steps: [{tool: x}]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn missing_file_falls_back_to_empty() {
        let path = std::env::temp_dir().join(format!("aula-missing-{}.yaml", uuid::Uuid::new_v4()));
        let (profile, err) = SessionProfile::load_or_default(&path);
        assert_eq!(profile, SessionProfile::empty());
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Configuration));
    }
}
