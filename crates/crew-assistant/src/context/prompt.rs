use crate::session::Role;

use super::extractor::ConversationDigest;

/// How many of the most recent `topics_mentioned` entries go into the prompt.
const RECENT_TOPICS: usize = 3;

/// Assembles the system message sent with each completion request.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    base_instruction: String,
    guidelines: String,
}

impl PromptBuilder {
    pub fn new(base_instruction: String) -> Self {
        Self {
            base_instruction,
            guidelines: Self::default_guidelines(),
        }
    }

    pub fn default_base_instruction() -> String {
        r#"Eres CrewSMART, el asistente virtual especializado para tripulaciones de JetSmart.

Tu personalidad es:
- Profesional pero cercano y amigable
- Usas un tono positivo y empático
- Tienes conocimiento experto sobre la operación de JetSmart
- Entiendes la vida de las tripulaciones y sus desafíos
- Usas términos propios de la aviación cuando es apropiado"#
            .to_string()
    }

    fn default_guidelines() -> String {
        r#"Instrucciones especiales:
- Mantén coherencia con las respuestas anteriores
- Usa las preferencias del usuario para personalizar la respuesta
- Si la pregunta se relaciona con temas previos, haz referencias explícitas
- Proporciona información específica según el rol del usuario
- Si detectas un cambio de tema, haz una transición suave
- Mantén el contexto de la base de operación si fue mencionada"#
            .to_string()
    }

    pub fn build_system_context(
        &self,
        role: Option<Role>,
        topic_context: &str,
        digest: &ConversationDigest,
    ) -> String {
        let role_text = role.map_or("miembro de la tripulación", |r| r.as_str());

        let preferences = if digest.preferences.is_empty() {
            "ninguna".to_string()
        } else {
            digest
                .preferences
                .entries()
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let base = digest
            .preferences
            .location()
            .unwrap_or("no especificada");

        let topics = &digest.topics_mentioned;
        let recent_topics = if topics.is_empty() {
            "ninguno".to_string()
        } else {
            topics[topics.len().saturating_sub(RECENT_TOPICS)..].join(", ")
        };

        let flow = if digest.topic_flow.is_empty() {
            "inicio de conversación".to_string()
        } else {
            digest.topic_flow.join(" → ")
        };

        let user_section = format!(
            "Información del usuario:\n- Rol: {}\n- Preferencias detectadas: {}\n- Base de operación: {}",
            role_text, preferences, base
        );

        let conversation_section = format!(
            "Contexto de la conversación:\n1. Tema actual: {}\n2. Temas previos mencionados: {}\n3. Flujo de la conversación: {}\n4. Historial reciente:\n{}",
            topic_context, recent_topics, flow, digest.text
        );

        [
            self.base_instruction.as_str(),
            user_section.as_str(),
            conversation_section.as_str(),
            self.guidelines.as_str(),
        ]
        .join("\n\n")
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(Self::default_base_instruction())
    }
}
