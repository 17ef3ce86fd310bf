//! Keyword matching over the topic table.
//!
//! Two strategies coexist and give different answers on purpose:
//! - [`TopicTable::best_match`] scores every topic by matched keyword count on
//!   accent-folded text. Used to pick the topic a reply is about.
//! - [`TopicTable::first_match`] returns the first topic in table order with
//!   any keyword hit on plain lower-cased text. Used to track topic flow.

use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::table::{Topic, TopicTable};

/// Lower-case, decompose (NFD) and drop combining marks
/// (`"Día"` -> `"dia"`, `"ñ"` -> `"n"`).
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

impl Topic {
    /// True if any keyword occurs in `lowered` (already lower-cased).
    pub fn mentioned_in(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Number of keywords found in `normalized` (output of [`normalize_text`]).
    /// Duplicate keywords count once per occurrence in the list.
    pub fn score(&self, normalized: &str) -> usize {
        self.normalized_keywords
            .iter()
            .filter(|k| normalized.contains(k.as_str()))
            .count()
    }
}

impl TopicTable {
    /// Topic with the most keyword hits; ties go to the earlier topic.
    pub fn best_match(&self, query: &str) -> Option<&Topic> {
        let normalized = normalize_text(query);
        let mut best: Option<(&Topic, usize)> = None;

        for topic in self.iter() {
            let score = topic.score(&normalized);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((topic, score));
            }
        }

        if let Some((topic, score)) = best {
            debug!("Best topic match '{}' (score {})", topic.id, score);
        }
        best.map(|(topic, _)| topic)
    }

    /// First topic in table order with any keyword in `lowered`.
    pub fn first_match(&self, lowered: &str) -> Option<&Topic> {
        self.iter().find(|topic| topic.mentioned_in(lowered))
    }

    /// Every topic with a keyword in `lowered`, in table order.
    pub fn mentioned<'a>(&'a self, lowered: &'a str) -> impl Iterator<Item = &'a Topic> + 'a {
        self.iter().filter(move |topic| topic.mentioned_in(lowered))
    }
}
