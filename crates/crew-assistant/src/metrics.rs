use indexmap::IndexMap;
use serde::Serialize;
use std::collections::VecDeque;

use crate::session::Role;

pub const DEFAULT_RESPONSE_WINDOW: usize = 1000;

/// Usage counters plus a capped window of response times.
///
/// Plain data; the session store serializes access behind its own lock.
#[derive(Debug)]
pub struct MetricsAggregator {
    total_interactions: u64,
    topic_frequency: IndexMap<String, u64>,
    role_frequency: IndexMap<Role, u64>,
    response_times: VecDeque<f64>,
    response_window: usize,
}

/// Point-in-time view of the aggregated metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_interactions: u64,
    /// Sorted by descending count; ties keep first-seen order.
    pub topic_frequency: Vec<(String, u64)>,
    pub role_frequency: IndexMap<Role, u64>,
    pub active_sessions: usize,
    pub avg_messages_per_session: f64,
    pub avg_response_time: f64,
    pub response_samples: usize,
}

impl MetricsAggregator {
    pub fn new(response_window: usize) -> Self {
        assert!(response_window > 0, "response window must be positive");
        Self {
            total_interactions: 0,
            topic_frequency: IndexMap::new(),
            role_frequency: IndexMap::new(),
            response_times: VecDeque::with_capacity(response_window),
            response_window,
        }
    }

    pub fn record_interaction(
        &mut self,
        topic: Option<&str>,
        role: Option<Role>,
        response_time_secs: Option<f64>,
    ) {
        self.total_interactions += 1;

        if let Some(topic) = topic {
            *self.topic_frequency.entry(topic.to_string()).or_insert(0) += 1;
        }

        if let Some(role) = role {
            *self.role_frequency.entry(role).or_insert(0) += 1;
        }

        if let Some(secs) = response_time_secs {
            self.response_times.push_back(secs);
            while self.response_times.len() > self.response_window {
                self.response_times.pop_front();
            }
        }
    }

    pub fn snapshot(&self, active_sessions: usize, total_messages: usize) -> MetricsSnapshot {
        let avg_messages_per_session = if active_sessions > 0 {
            total_messages as f64 / active_sessions as f64
        } else {
            0.0
        };

        let mut topic_frequency: Vec<(String, u64)> = self
            .topic_frequency
            .iter()
            .map(|(topic, count)| (topic.clone(), *count))
            .collect();
        // stable sort: equal counts stay in first-seen order
        topic_frequency.sort_by(|a, b| b.1.cmp(&a.1));

        MetricsSnapshot {
            total_interactions: self.total_interactions,
            topic_frequency,
            role_frequency: self.role_frequency.clone(),
            active_sessions,
            avg_messages_per_session,
            avg_response_time: self.avg_response_time(),
            response_samples: self.response_times.len(),
        }
    }

    pub fn avg_response_time(&self) -> f64 {
        if self.response_times.is_empty() {
            return 0.0;
        }
        self.response_times.iter().sum::<f64>() / self.response_times.len() as f64
    }

    pub fn response_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.response_times.iter().copied()
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_WINDOW)
    }
}
