use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use uuid::Uuid;

use crew_assistant::engine::validate_message;
use crew_assistant::logging::init_logger;
use crew_assistant::services::LlmService;
use crew_assistant::topics::TopicTable;
use crew_assistant::{ConversationEngine, SessionStore, SessionStoreConfig, Settings};

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    init_logger(&settings.logging)?;

    info!("🚀 Starting crew assistant...");

    let topics = match &settings.topics.path {
        Some(path) => TopicTable::load(path)?,
        None => TopicTable::builtin()?,
    };
    info!("✅ Topic table loaded ({} topics)", topics.len());

    let store = Arc::new(SessionStore::new(SessionStoreConfig::from_settings(
        &settings.sessions,
        settings.metrics.response_window,
    )));

    if settings.llm.api_key.is_none() {
        warn!("No LLM API key configured; topic answers will use the fallback text");
    }
    let llm_service = Arc::new(LlmService::new(settings.llm.clone())?);

    let engine = ConversationEngine::new(
        store,
        Arc::new(topics),
        llm_service,
        settings.context.max_context_chars,
    );

    let mut session_id = new_session_id();
    info!("🎯 Session {} ready", session_id);
    println!("CrewSMART listo. Comandos: /metrics, /new, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/new" => {
                session_id = new_session_id();
                info!("Started session {}", session_id);
                println!("Nueva sesión: {}", session_id);
            }
            "/metrics" => match serde_json::to_string_pretty(&engine.metrics_snapshot()) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize metrics: {}", e),
            },
            _ => match validate_message(&line) {
                Ok(message) => {
                    let reply = engine.handle(&session_id, message).await;
                    println!("{}\n", reply);
                }
                Err(e) => warn!("Rejected input: {}", e),
            },
        }
    }

    info!("👋 Crew assistant stopped");
    Ok(())
}
