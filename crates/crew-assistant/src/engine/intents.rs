//! Intent short-circuits
//!
//! Detects farewells, role declarations and greetings before topic matching.
//! Input is expected lower-cased and trimmed.

use tracing::debug;

use crate::session::Role;

const FAREWELLS: [&str; 10] = [
    "adios",
    "adiós",
    "chao",
    "hasta luego",
    "nos vemos",
    "bye",
    "gracias",
    "muchas gracias",
    "thank you",
    "thanks",
];

const GREETINGS: [&str; 7] = [
    "hola",
    "buenos dias",
    "buenos días",
    "buenas tardes",
    "buenas noches",
    "hi",
    "hello",
];

/// Greetings only short-circuit while the history is this short.
const GREETING_MAX_HISTORY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Farewell { thanks: bool },
    DeclareRole(Role),
    Greeting,
}

pub struct IntentDetector;

impl IntentDetector {
    /// Checked in order: farewell, role declaration, greeting.
    pub fn detect(message: &str, history_len: usize) -> Option<Intent> {
        if FAREWELLS.iter().any(|f| message.contains(f)) {
            let thanks = message.contains("gracias") || message.contains("thank");
            debug!("Detected farewell intent (thanks={})", thanks);
            return Some(Intent::Farewell { thanks });
        }

        if let Some(role) = Self::declared_role(message) {
            debug!("Detected role declaration: {}", role);
            return Some(Intent::DeclareRole(role));
        }

        if history_len <= GREETING_MAX_HISTORY && GREETINGS.iter().any(|g| message.contains(g)) {
            debug!("Detected greeting intent");
            return Some(Intent::Greeting);
        }

        None
    }

    fn declared_role(message: &str) -> Option<Role> {
        if message.contains("soy tripulante") {
            Some(Role::Crew)
        } else if message.contains("soy piloto") {
            Some(Role::Pilot)
        } else if message.contains("soy capitan") || message.contains("soy capitán") {
            Some(Role::Captain)
        } else {
            None
        }
    }
}

impl Intent {
    /// Fixed reply for this intent. `role` is the session role after the
    /// intent has been applied.
    pub fn response(&self, role: Option<Role>) -> String {
        match self {
            Intent::Farewell { thanks } => farewell_response(*thanks, role),
            Intent::DeclareRole(Role::Crew) => {
                "¡Bienvenido/a a bordo! 🛫 Te atenderé como Tripulante de Cabina. ¿En qué puedo ayudarte hoy?".to_string()
            }
            Intent::DeclareRole(Role::Pilot) => {
                "¡Bienvenido/a al cockpit! 🛩️ Te atenderé como Piloto. ¿En qué puedo asistirte hoy?".to_string()
            }
            Intent::DeclareRole(Role::Captain) => {
                "¡Bienvenido/a, Comandante! ✈️ Te atenderé como Capitán. ¿En qué puedo ayudarte hoy?".to_string()
            }
            Intent::Greeting => {
                "¡Hola! 👋 Soy CrewSMART, tu asistente virtual para tripulaciones de JetSmart. Estoy aquí para ayudarte con información sobre bonos, turnos, vacaciones y más. ¿En qué puedo asistirte hoy?".to_string()
            }
        }
    }
}

fn role_emoji(role: Option<Role>) -> &'static str {
    match role {
        None | Some(Role::Crew) => "🛫",
        Some(Role::Captain) => "✈️",
        Some(Role::Pilot) => "🛩️",
    }
}

fn farewell_response(thanks: bool, role: Option<Role>) -> String {
    let emoji = role_emoji(role);
    if thanks {
        format!(
            "¡Ha sido un placer ayudarte! {} Como tu asistente virtual, siempre estoy aquí para responder tus dudas sobre beneficios, turnos, vacaciones o cualquier otra consulta que tengas. ¡Que tengas excelentes vuelos! \n\nSi necesitas más información en el futuro, no dudes en preguntarme. ¡Hasta pronto! 👋",
            emoji
        )
    } else {
        format!(
            "¡Hasta pronto! {} Recuerda que siempre estoy aquí para ayudarte con cualquier consulta sobre tus beneficios, turnos, vacaciones y más. ¡Que tengas excelentes vuelos! \n\nSi necesitas más información en el futuro, estaré encantado/a de asistirte nuevamente. ¡Buen viaje! 👋",
            emoji
        )
    }
}

/// Menu shown when nothing else matched.
pub fn generic_response(role: Option<Role>) -> String {
    let role_text = role.map(|r| format!(" como {}", r)).unwrap_or_default();
    format!(
        "¡Estoy aquí para ayudarte{}! 🚀 \n\n\
Puedo brindarte información sobre:\n\
📊 Bonos (productividad, asistencia, instructor)\n\
🏖️ Vacaciones y días libres\n\
⏰ Turnos y contingencias\n\
🎯 Entrenamientos y simulador\n\
📅 Días festivos\n\n\
¿Sobre qué tema te gustaría saber más? También puedes indicarme tu rol escribiendo 'Soy Tripulante/Piloto/Capitán' para información más específica.",
        role_text
    )
}
