use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

/// Occurrences older than this are forgotten
pub const PATTERN_WINDOW_SECS: i64 = 300;

/// Counts how often the same failure message occurred recently.
#[derive(Debug, Clone, Default)]
pub struct ErrorPatternTracker {
    occurrences: HashMap<String, Vec<DateTime<Utc>>>,
}

impl ErrorPatternTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an occurrence of `message` at `now` and return how many occurrences fall into the
    /// window ending at `now`.
    pub fn record(&mut self, message: &str, now: DateTime<Utc>) -> usize {
        let window = TimeDelta::seconds(PATTERN_WINDOW_SECS);

        // messages with nothing left in the window are forgotten entirely
        self.occurrences.retain(|_, seen| {
            seen.retain(|at| now.signed_duration_since(*at) < window);
            !seen.is_empty()
        });

        let entries = self.occurrences.entry(message.to_string()).or_default();
        entries.push(now);
        entries.len()
    }

    /// Number of distinct messages still inside the window
    pub fn tracked(&self) -> usize {
        self.occurrences.len()
    }
}
