use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;

use crew_assistant::clock::ManualClock;
use crew_assistant::session::Role;
use crew_assistant::topics::TopicTable;
use crew_assistant::{CompletionProvider, ConversationEngine, SessionStore, SessionStoreConfig};

/// Records every call and answers with a fixed reply, or fails when `reply` is None.
struct StubProvider {
    reply: Option<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubProvider {
    fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, system_context: &str, user_message: &str) -> anyhow::Result<String> {
        self.calls
            .lock()
            .push((system_context.to_string(), user_message.to_string()));
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("completion endpoint unavailable"))
    }
}

fn build_engine(provider: Arc<StubProvider>, config: SessionStoreConfig) -> ConversationEngine {
    let topics = Arc::new(TopicTable::builtin().expect("builtin topics parse"));
    let store = Arc::new(SessionStore::new(config));
    ConversationEngine::new(store, topics, provider, 2000)
}

#[tokio::test]
async fn role_flows_into_topic_context() {
    let provider = Arc::new(StubProvider::answering("El bono depende de tus horas."));
    let engine = build_engine(Arc::clone(&provider), SessionStoreConfig::default());

    engine.handle("crew-1", "Hola").await;
    engine.handle("crew-1", "Soy Capitán").await;
    let reply = engine.handle("crew-1", "¿Cómo funciona el bono de productividad?").await;

    assert_eq!(reply, "El bono depende de tus horas.");

    let calls = provider.calls.lock();
    assert_eq!(calls.len(), 1);
    let (system, user) = &calls[0];
    assert_eq!(user, "¿cómo funciona el bono de productividad?");
    assert!(system.contains("- Rol: capitan"));
    assert!(system.contains("Capitan"));
    assert!(!system.contains("{role}"));
    assert!(!system.contains("{role_info}"));
}

#[tokio::test]
async fn failed_completion_returns_rendered_template() {
    let provider = Arc::new(StubProvider::failing());
    let engine = build_engine(Arc::clone(&provider), SessionStoreConfig::default());

    let reply = engine.handle("crew-2", "instructor con capacitación").await;

    let topic = engine.topics().get("bono_instructor").expect("topic exists");
    assert_eq!(reply, topic.render_context(None).trim());
    assert!(!reply.contains("{base_amount}"));
    assert!(!reply.contains("{daily_amount}"));
    assert_eq!(provider.calls.lock().len(), 1);
}

#[tokio::test]
async fn unknown_message_gets_menu_without_completion() {
    let provider = Arc::new(StubProvider::answering("unused"));
    let engine = build_engine(Arc::clone(&provider), SessionStoreConfig::default());

    engine.handle("crew-3", "soy piloto").await;
    let reply = engine.handle("crew-3", "xyz").await;

    assert!(reply.starts_with("¡Estoy aquí para ayudarte como piloto!"));
    assert!(provider.calls.lock().is_empty());
}

#[tokio::test]
async fn history_digest_tracks_topics() {
    let provider = Arc::new(StubProvider::answering("ok"));
    let engine = build_engine(Arc::clone(&provider), SessionStoreConfig::default());

    engine.handle("crew-4", "quiero saber de vacaciones").await;
    engine.handle("crew-4", "y del simulador").await;

    let session = engine.store().peek_session("crew-4").expect("session exists");
    let messages = session.lock().messages.clone();
    let digest = engine.extract_digest(&messages);

    assert!(digest.topics_mentioned.contains(&"vacaciones".to_string()));
    assert!(digest.topics_mentioned.contains(&"simulador".to_string()));
    assert_eq!(
        digest.topic_flow,
        vec!["simulador".to_string(), "vacaciones".to_string()]
    );
}

#[tokio::test]
async fn idle_sessions_expire_after_timeout() {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
    let config = SessionStoreConfig {
        session_timeout: TimeDelta::seconds(600),
        sweep_interval: TimeDelta::seconds(60),
        ..Default::default()
    };
    let store = Arc::new(SessionStore::with_clock(config, clock.clone()));
    let topics = Arc::new(TopicTable::builtin().expect("builtin topics parse"));
    let engine = ConversationEngine::new(
        Arc::clone(&store),
        topics,
        Arc::new(StubProvider::answering("ok")),
        2000,
    );

    engine.handle("idle", "soy tripulante").await;
    clock.advance_secs(300);
    engine.handle("active", "hola").await;
    clock.advance_secs(400);
    engine.handle("active", "turnos").await;

    assert!(store.peek_session("idle").is_none());
    let active = store.peek_session("active").expect("active session kept");
    assert_eq!(active.lock().messages.len(), 4);

    // metrics history outlives the evicted session
    let snapshot = engine.metrics_snapshot();
    assert_eq!(snapshot.total_interactions, 3);
    assert_eq!(snapshot.active_sessions, 1);
    assert_eq!(snapshot.role_frequency.get(&Role::Crew), Some(&1));
}
