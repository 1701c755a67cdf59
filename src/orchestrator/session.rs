//! Session history (spec §3.1 Session, §4.9, §6)
//!
//! A process-wide, in-memory FIFO of recent responses per session id,
//! guarded by a lock and never held across an external call (spec §5).
//! Grounded on the teacher's `memory/episodic.rs` sliding-window
//! `EpisodicMemory`, narrowed to the spec's `HistoryItem` shape. Per the
//! spec's explicit Non-goal ("persistence of conversation history across
//! process restarts... not part of the core"), this is intentionally
//! in-memory only — the teacher's disk-backed `SessionManager` is not
//! carried over for this concern (see DESIGN.md).

use crate::entities::HistoryItem;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

pub struct SessionStore {
    max_len: usize,
    sessions: RwLock<HashMap<String, VecDeque<HistoryItem>>>,
}

impl SessionStore {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Appends `item` to `session_id`'s history, truncating the oldest
    /// entries once `max_len` is exceeded.
    pub async fn append(&self, session_id: &str, item: HistoryItem) {
        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push_back(item);
        while history.len() > self.max_len {
            history.pop_front();
        }
    }

    /// Returns a snapshot of `session_id`'s history, oldest first. Empty
    /// (not an error) for an unknown session id.
    pub async fn history(&self, session_id: &str) -> Vec<HistoryItem> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Intent;
    use chrono::Utc;

    fn item(query: &str) -> HistoryItem {
        HistoryItem {
            query: query.to_string(),
            intent: Intent::GeneralInquiry,
            confidence: 0.3,
            agent: "OrchestrationAgent".to_string(),
            success: true,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn appends_and_reads_back_in_order() {
        let store = SessionStore::new(50);
        store.append("s1", item("first")).await;
        store.append("s1", item("second")).await;
        let history = store.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().query, "second");
    }

    #[tokio::test]
    async fn truncates_to_max_len() {
        let store = SessionStore::new(2);
        for i in 0..5 {
            store.append("s1", item(&format!("q{}", i))).await;
        }
        let history = store.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "q3");
        assert_eq!(history[1].query, "q4");
    }

    #[tokio::test]
    async fn clear_empties_a_session() {
        let store = SessionStore::new(50);
        store.append("s1", item("first")).await;
        store.clear("s1").await;
        assert!(store.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::new(50);
        store.append("s1", item("a")).await;
        store.append("s2", item("b")).await;
        assert_eq!(store.history("s1").await.len(), 1);
        assert_eq!(store.history("s2").await.len(), 1);
    }
}
