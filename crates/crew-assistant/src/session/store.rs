use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{BoundedCache, DEFAULT_CAPACITY};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionsConfig;
use crate::metrics::{MetricsAggregator, MetricsSnapshot, DEFAULT_RESPONSE_WINDOW};

use super::types::{Message, SessionHandle, SessionId, SessionRecord, DEFAULT_MAX_MESSAGES};

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub capacity: usize,
    pub session_timeout: TimeDelta,
    pub sweep_interval: TimeDelta,
    pub max_messages: usize,
    pub response_window: usize,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            session_timeout: TimeDelta::seconds(3600),
            sweep_interval: TimeDelta::seconds(300),
            max_messages: DEFAULT_MAX_MESSAGES,
            response_window: DEFAULT_RESPONSE_WINDOW,
        }
    }
}

impl SessionStoreConfig {
    pub fn from_settings(sessions: &SessionsConfig, response_window: usize) -> Self {
        Self {
            capacity: sessions.capacity,
            session_timeout: secs_to_delta(sessions.timeout_secs),
            sweep_interval: secs_to_delta(sessions.sweep_interval_secs),
            max_messages: sessions.max_messages,
            response_window,
        }
    }
}

fn secs_to_delta(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

struct StoreInner {
    sessions: BoundedCache<SessionId, SessionHandle>,
    last_sweep: DateTime<Utc>,
}

/// Owns every live session plus the usage metrics.
///
/// Lock order is store -> session. Callers must release a session guard
/// before calling back into the store.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    metrics: Mutex<MetricsAggregator>,
    clock: Arc<dyn Clock>,
    config: SessionStoreConfig,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionStoreConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing session store: capacity={}, timeout={}s, sweep_interval={}s, max_messages={}",
            config.capacity,
            config.session_timeout.num_seconds(),
            config.sweep_interval.num_seconds(),
            config.max_messages
        );
        let now = clock.now();
        Self {
            inner: Mutex::new(StoreInner {
                sessions: BoundedCache::new(config.capacity),
                last_sweep: now,
            }),
            metrics: Mutex::new(MetricsAggregator::new(config.response_window)),
            clock,
            config,
        }
    }

    /// Fetch the session for `id`, creating an empty one if it does not
    /// exist. Runs the expiry sweep first when the sweep interval has elapsed.
    ///
    /// Lookup and creation happen under one lock, so concurrent callers with
    /// the same unseen id receive the same handle.
    pub fn get_session(&self, id: &str) -> SessionHandle {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if now - inner.last_sweep >= self.config.sweep_interval {
            self.sweep_locked(&mut inner, now);
        }

        let key = id.to_string();
        if let Some(handle) = inner.sessions.get(&key) {
            let handle = Arc::clone(handle);
            handle.lock().touch(now);
            return handle;
        }

        let handle: SessionHandle = Arc::new(Mutex::new(SessionRecord::new(key.clone(), now)));
        if let Some((evicted, _)) = inner.sessions.put(key, Arc::clone(&handle)) {
            debug!("Session {} evicted by capacity pressure", evicted);
        }
        debug!("Created session {} ({} active)", id, inner.sessions.len());
        handle
    }

    /// Append a message to the session history, enforcing the size cap.
    pub fn append_message(&self, session: &SessionHandle, text: &str, is_user: bool) {
        let now = self.clock.now();
        let mut record = session.lock();
        record.push_message(Message::new(text, is_user, now), self.config.max_messages);
        record.touch(now);
    }

    /// Record one handled interaction and return the refreshed snapshot.
    pub fn record_metrics(
        &self,
        session: &SessionHandle,
        topic: Option<&str>,
        latency_secs: Option<f64>,
    ) -> MetricsSnapshot {
        let role = session.lock().role;
        self.metrics.lock().record_interaction(topic, role, latency_secs);

        let snapshot = self.metrics_snapshot();
        debug!(
            "Metrics updated: total={}, active_sessions={}, avg_messages={:.2}",
            snapshot.total_interactions,
            snapshot.active_sessions,
            snapshot.avg_messages_per_session
        );
        snapshot
    }

    /// Metrics with session gauges recomputed from the live cache.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let (active, total_messages) = self.session_gauges();
        self.metrics.lock().snapshot(active, total_messages)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }

    /// Look up a session without creating it or touching its recency.
    pub fn peek_session(&self, id: &str) -> Option<SessionHandle> {
        self.inner.lock().sessions.peek(&id.to_string()).cloned()
    }

    fn session_gauges(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        let total_messages = inner
            .sessions
            .values()
            .map(|handle| handle.lock().message_count())
            .sum();
        (inner.sessions.len(), total_messages)
    }

    fn sweep_locked(&self, inner: &mut StoreInner, now: DateTime<Utc>) {
        inner.last_sweep = now;
        let timeout = self.config.session_timeout;
        let removed = inner
            .sessions
            .retain(|_, handle| now - handle.lock().last_activity() < timeout);

        if removed > 0 {
            info!("Swept {} expired sessions ({} remaining)", removed, inner.sessions.len());
        } else {
            debug!("Session sweep found nothing to remove");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionStoreConfig::default())
    }
}
