//! Conversation engine
//!
//! Per-message flow:
//! 1. Normalize and record the user message
//! 2. Short-circuit farewells, role declarations and early greetings
//! 3. Otherwise match a topic and ask the completion provider
//! 4. Record the reply and the interaction metrics

mod intents;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::context::{extract_location, ContextExtractor, ConversationDigest, PromptBuilder};
use crate::error::{AssistantError, Result};
use crate::metrics::MetricsSnapshot;
use crate::session::{Message, Role, SessionHandle, SessionStore};
use crate::topics::{Topic, TopicTable};

pub use intents::{generic_response, Intent, IntentDetector};

/// Completion backend used for topic answers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system_context: &str, user_message: &str) -> anyhow::Result<String>;
}

/// Reject input the engine should never see.
pub fn validate_message(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AssistantError::InvalidInput("message text is empty".to_string()));
    }
    Ok(trimmed)
}

pub struct ConversationEngine {
    store: Arc<SessionStore>,
    topics: Arc<TopicTable>,
    extractor: ContextExtractor,
    prompt_builder: PromptBuilder,
    provider: Arc<dyn CompletionProvider>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<SessionStore>,
        topics: Arc<TopicTable>,
        provider: Arc<dyn CompletionProvider>,
        max_context_chars: usize,
    ) -> Self {
        Self {
            extractor: ContextExtractor::new(Arc::clone(&topics), max_context_chars),
            prompt_builder: PromptBuilder::default(),
            store,
            topics,
            provider,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn topics(&self) -> &TopicTable {
        &self.topics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.store.metrics_snapshot()
    }

    pub fn extract_digest(&self, messages: &[Message]) -> ConversationDigest {
        self.extractor.extract(messages)
    }

    /// Answer one user message. Always produces a reply; completion
    /// failures fall back to the topic context text.
    pub async fn handle(&self, session_id: &str, raw_message: &str) -> String {
        let started = Instant::now();
        let message = raw_message.trim().to_lowercase();

        let session = self.store.get_session(session_id);
        self.store.append_message(&session, &message, true);

        let (role, history_len) = {
            let mut record = session.lock();
            if let Some(base) = extract_location(&message) {
                debug!("Session {} operating base: {}", session_id, base);
                record.base = Some(base);
            }
            (record.role, record.messages.len())
        };

        let (response, topic_id) = match IntentDetector::detect(&message, history_len) {
            Some(Intent::DeclareRole(new_role)) => {
                session.lock().role = Some(new_role);
                info!("Session {} declared role {}", session_id, new_role);
                (Intent::DeclareRole(new_role).response(Some(new_role)), None)
            }
            Some(intent) => (intent.response(role), None),
            None => match self.topics.best_match(&message) {
                Some(topic) => {
                    let answer = self.answer_topic(&session, topic, role, &message).await;
                    (answer, Some(topic.id.clone()))
                }
                None => (generic_response(role), None),
            },
        };

        self.store.append_message(&session, &response, false);
        let elapsed = started.elapsed().as_secs_f64();
        self.store
            .record_metrics(&session, topic_id.as_deref(), Some(elapsed));

        debug!(
            "Session {} handled in {:.3}s (topic: {})",
            session_id,
            elapsed,
            topic_id.as_deref().unwrap_or("none")
        );
        response
    }

    async fn answer_topic(
        &self,
        session: &SessionHandle,
        topic: &Topic,
        role: Option<Role>,
        message: &str,
    ) -> String {
        let context = topic.render_context(role);

        let digest = {
            let mut record = session.lock();
            record.last_topic = Some(topic.id.clone());
            self.extractor.extract(&record.messages)
        };

        let system_context = self
            .prompt_builder
            .build_system_context(role, &context, &digest);

        match self.provider.complete(&system_context, message).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                warn!("Empty completion for topic {}, using topic context", topic.id);
                context.trim().to_string()
            }
            Err(e) => {
                warn!("Completion failed for topic {}: {}. Using topic context", topic.id, e);
                context.trim().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStoreConfig;

    fn engine_with(provider: MockCompletionProvider) -> ConversationEngine {
        let topics = Arc::new(TopicTable::builtin().unwrap());
        let store = Arc::new(SessionStore::new(SessionStoreConfig::default()));
        ConversationEngine::new(store, topics, Arc::new(provider), 2000)
    }

    #[test]
    fn test_validate_message() {
        assert_eq!(validate_message("  hola ").unwrap(), "hola");
        assert!(matches!(
            validate_message("   "),
            Err(AssistantError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_topic_uses_completion() {
        let mut provider = MockCompletionProvider::new();
        provider
            .expect_complete()
            .withf(|system, user| system.contains("Tema actual:") && user.to_string() == "cuantas vacaciones tengo")
            .times(1)
            .returning(|_, _| Ok("Tienes 30 días".to_string()));

        let engine = engine_with(provider);
        let reply = engine.handle("s1", "  Cuantas VACACIONES tengo ").await;
        assert_eq!(reply, "Tienes 30 días");

        let session = engine.store().peek_session("s1").unwrap();
        let record = session.lock();
        assert_eq!(record.last_topic.as_deref(), Some("vacaciones"));
        assert_eq!(record.messages.len(), 2);
        assert!(record.messages[0].is_user);
        assert!(!record.messages[1].is_user);
    }

    #[tokio::test]
    async fn test_completion_failure_falls_back_to_context() {
        let mut provider = MockCompletionProvider::new();
        provider
            .expect_complete()
            .returning(|_, _| Err(anyhow::anyhow!("timeout")));

        let engine = engine_with(provider);
        let reply = engine.handle("s1", "vacaciones").await;

        let expected = engine
            .topics()
            .get("vacaciones")
            .unwrap()
            .render_context(None)
            .trim()
            .to_string();
        assert_eq!(reply, expected);

        let snapshot = engine.metrics_snapshot();
        assert_eq!(snapshot.total_interactions, 1);
        assert_eq!(snapshot.topic_frequency, vec![("vacaciones".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_empty_completion_falls_back() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().returning(|_, _| Ok("  ".to_string()));

        let engine = engine_with(provider);
        let reply = engine.handle("s1", "festivos").await;
        assert!(!reply.trim().is_empty());
        assert_eq!(reply, reply.trim());
    }

    #[tokio::test]
    async fn test_role_declaration_sets_role() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().never();

        let engine = engine_with(provider);
        let reply = engine.handle("s1", "Soy Piloto").await;
        assert!(reply.contains("Piloto"));

        let session = engine.store().peek_session("s1").unwrap();
        assert_eq!(session.lock().role, Some(Role::Pilot));

        let snapshot = engine.metrics_snapshot();
        assert_eq!(snapshot.role_frequency.get(&Role::Pilot), Some(&1));
    }

    #[tokio::test]
    async fn test_greeting_only_at_start() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().never();

        let engine = engine_with(provider);
        let first = engine.handle("s1", "hola").await;
        assert!(first.starts_with("¡Hola! 👋"));

        // history is now 3 messages when the second greeting arrives
        let second = engine.handle("s1", "hola").await;
        assert!(second.starts_with("¡Estoy aquí para ayudarte"));
    }

    #[tokio::test]
    async fn test_farewell_uses_role_emoji() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().never();

        let engine = engine_with(provider);
        engine.handle("s1", "soy capitán").await;
        let reply = engine.handle("s1", "muchas gracias").await;
        assert!(reply.starts_with("¡Ha sido un placer ayudarte! ✈️"));
    }

    #[tokio::test]
    async fn test_metrics_recorded_on_every_path() {
        let mut provider = MockCompletionProvider::new();
        provider
            .expect_complete()
            .returning(|_, _| Ok("respuesta".to_string()));

        let engine = engine_with(provider);
        engine.handle("s1", "hola").await;
        engine.handle("s1", "soy tripulante").await;
        engine.handle("s1", "algo sin tema").await;
        engine.handle("s1", "bono de productividad").await;
        engine.handle("s1", "adios").await;

        let snapshot = engine.metrics_snapshot();
        assert_eq!(snapshot.total_interactions, 5);
        assert_eq!(snapshot.active_sessions, 1);
        assert_eq!(snapshot.response_samples, 5);
        assert_eq!(snapshot.avg_messages_per_session, 10.0);
        assert_eq!(
            snapshot.topic_frequency,
            vec![("bono_productividad".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_operating_base_captured() {
        let mut provider = MockCompletionProvider::new();
        provider.expect_complete().never();

        let engine = engine_with(provider);
        engine.handle("s1", "trabajo en la base de santiago").await;

        let session = engine.store().peek_session("s1").unwrap();
        assert_eq!(session.lock().base.as_deref(), Some("santiago"));
    }
}
