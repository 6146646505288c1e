//! Lucky hit history
//!
//! Keeps the most recent sensor hits for the lucky log window, oldest first.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sim::{BodyId, CommentPayload};

/// Maximum number of lucky hits to keep
pub const MAX_LUCKY_ENTRIES: usize = 50;

/// A single lucky hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckyEntry {
    pub body_id: BodyId,
    pub payload: Arc<CommentPayload>,
    /// World clock when the hit happened
    pub at_ms: f64,
}

/// Bounded lucky hit log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LuckyLog {
    entries: VecDeque<LuckyEntry>,
    /// Hits recorded since start, including evicted ones
    total: u64,
}

impl LuckyLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit, evicting the oldest entry when full
    pub fn record(&mut self, body_id: BodyId, payload: Arc<CommentPayload>, at_ms: f64) {
        self.entries.push_back(LuckyEntry {
            body_id,
            payload,
            at_ms,
        });
        while self.entries.len() > MAX_LUCKY_ENTRIES {
            self.entries.pop_front();
        }
        self.total += 1;
    }

    pub fn entries(&self) -> impl Iterator<Item = &LuckyEntry> {
        self.entries.iter()
    }

    /// Owned copy, oldest first
    pub fn to_vec(&self) -> Vec<LuckyEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Most recent hit (if any)
    pub fn latest(&self) -> Option<&LuckyEntry> {
        self.entries.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Color;

    fn payload(text: &str) -> Arc<CommentPayload> {
        Arc::new(CommentPayload::text(text, Color::from_hue(0.0)))
    }

    #[test]
    fn test_record_keeps_order() {
        let mut log = LuckyLog::new();
        assert!(log.is_empty());
        log.record(BodyId(1), payload("first"), 10.0);
        log.record(BodyId(2), payload("second"), 20.0);

        let texts: Vec<_> = log.entries().map(|e| e.payload.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(log.latest().unwrap().body_id, BodyId(2));
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = LuckyLog::new();
        for i in 0..(MAX_LUCKY_ENTRIES as u32 + 7) {
            log.record(BodyId(i), payload("x"), i as f64);
        }
        assert_eq!(log.len(), MAX_LUCKY_ENTRIES);
        assert_eq!(log.total(), MAX_LUCKY_ENTRIES as u64 + 7);
        // Oldest entries were evicted
        assert_eq!(log.to_vec()[0].body_id, BodyId(7));
    }
}
