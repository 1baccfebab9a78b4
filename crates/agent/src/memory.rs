//! Conversation Memory
//!
//! Per-session state:
//! - Bounded turn buffer (user + assistant pairs)
//! - Consecutive retrieval failure counter
//!
//! Sessions live behind the [`SessionStore`] trait. The in-memory store keeps
//! one async mutex per session so a whole turn can hold it. Clearing takes
//! the same lock, so it waits for an in-flight turn instead of racing it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use docbot_core::{Message, Turn, TurnRole};

/// One conversational thread
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    turns: VecDeque<Turn>,
    failure_count: u32,
    max_turns: usize,
    pub created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Session {
    /// Empty session keeping at most `max_turns` turns (both roles)
    pub fn new(id: impl Into<String>, max_turns: usize) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            turns: VecDeque::new(),
            failure_count: 0,
            max_turns: max_turns.max(2),
            created_at: now,
            last_active: now,
        }
    }

    /// Append a turn, dropping the oldest ones past the cap
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push_back(Turn::new(role, content));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
        self.last_active = Utc::now();
    }

    /// Append a user question and its reply
    pub fn append_exchange(&mut self, question: &str, reply: &str) {
        self.append(TurnRole::User, question);
        self.append(TurnRole::Assistant, reply);
    }

    pub fn turns(&self) -> impl DoubleEndedIterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Time of the last append or clear
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Forget every turn and the failure counter
    pub fn clear(&mut self) {
        self.turns.clear();
        self.failure_count = 0;
        self.last_active = Utc::now();
    }

    /// Last `n` exchanges, oldest first
    pub fn recent_pairs(&self, n: usize) -> Vec<&Turn> {
        let take = n.saturating_mul(2).min(self.turns.len());
        self.turns.iter().skip(self.turns.len() - take).collect()
    }

    /// Content of the newest turn with `role` for which `skip` is false
    pub fn last_by_role<F>(&self, role: TurnRole, skip: F) -> Option<&str>
    where
        F: Fn(&str) -> bool,
    {
        self.turns
            .iter()
            .rev()
            .filter(|t| t.role == role)
            .find(|t| !skip(&t.content))
            .map(|t| t.content.as_str())
    }

    /// Newest assistant turn, whatever it says
    pub fn last_assistant(&self) -> Option<&str> {
        self.last_by_role(TurnRole::Assistant, |_| false)
    }

    /// Last `max_pairs` exchanges as chat messages, oldest first
    pub fn history_messages(&self, max_pairs: usize) -> Vec<Message> {
        self.recent_pairs(max_pairs).into_iter().map(Message::from).collect()
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Increment the failure counter and return the new value
    pub fn record_failure(&mut self) -> u32 {
        self.failure_count = self.failure_count.saturating_add(1);
        self.failure_count
    }

    pub fn reset_failures(&mut self) {
        self.failure_count = 0;
    }
}

/// Shared handle to a session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Session storage backend
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Existing session or a fresh one
    async fn get_or_create(&self, id: &str) -> SessionHandle;

    /// Existing session, if any
    async fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Empty a session's turns and failure counter under its lock
    ///
    /// Returns whether the session existed.
    async fn clear(&self, id: &str) -> bool;

    /// Drop sessions idle for longer than `max_idle`, returning how many
    ///
    /// Sessions with a turn in flight are kept.
    fn evict_idle(&self, max_idle: Duration) -> usize;

    /// Number of live sessions
    fn count(&self) -> usize;
}

/// In-process session store
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionHandle>,
    max_turns: usize,
}

impl InMemorySessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns,
        }
    }

    pub fn from_config(config: &docbot_config::MemoryConfig) -> Self {
        Self::new(config.max_turns())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, id: &str) -> SessionHandle {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Creating session");
                Arc::new(Mutex::new(Session::new(id, self.max_turns)))
            })
            .clone()
    }

    async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    async fn clear(&self, id: &str) -> bool {
        // Clone out of the map so no shard lock is held across the await
        let handle = self.sessions.get(id).map(|entry| entry.value().clone());
        match handle {
            Some(handle) => {
                handle.lock().await.clear();
                true
            }
            None => false,
        }
    }

    fn evict_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();

        // A handle referenced outside the map belongs to an in-flight request
        self.sessions.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(session) => session.last_active() >= cutoff,
                Err(_) => true,
            }
        });

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_trims_to_cap() {
        let mut session = Session::new("s1", 4);
        for i in 0..5 {
            session.append_exchange(&format!("pregunta {i}"), &format!("respuesta {i}"));
        }
        assert_eq!(session.len(), 4);
        let first = session.turns().next().unwrap();
        assert_eq!(first.content, "pregunta 3");
    }

    #[test]
    fn test_recent_pairs() {
        let mut session = Session::new("s1", 16);
        session.append_exchange("a", "b");
        session.append_exchange("c", "d");
        let recent: Vec<&str> = session.recent_pairs(1).iter().map(|t| t.content.as_str()).collect();
        assert_eq!(recent, vec!["c", "d"]);
        assert_eq!(session.recent_pairs(10).len(), 4);
    }

    #[test]
    fn test_last_by_role_with_skip() {
        let mut session = Session::new("s1", 16);
        session.append_exchange("como creo una cuenta", "Ingrese al plan de cuentas");
        session.append_exchange("ayuda", "Te voy a conectar con un especialista");

        let last = session.last_by_role(TurnRole::Assistant, |c| c.contains("conectar"));
        assert_eq!(last, Some("Ingrese al plan de cuentas"));
        assert_eq!(session.last_assistant(), Some("Te voy a conectar con un especialista"));
        assert_eq!(session.last_by_role(TurnRole::User, |_| true), None);
    }

    #[test]
    fn test_failure_counter() {
        let mut session = Session::new("s1", 16);
        assert_eq!(session.record_failure(), 1);
        assert_eq!(session.record_failure(), 2);
        session.reset_failures();
        assert_eq!(session.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = InMemorySessionStore::new(16);
        assert!(store.get("abc").await.is_none());

        let handle = store.get_or_create("abc").await;
        handle.lock().await.append_exchange("hola", "¡Hola!");

        let again = store.get_or_create("abc").await;
        assert_eq!(again.lock().await.len(), 2);
        assert_eq!(store.count(), 1);

        assert!(store.clear("abc").await);
        assert!(again.lock().await.is_empty());
        assert!(!store.clear("missing").await);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_clear_resets_session() {
        let mut session = Session::new("s1", 16);
        session.append_exchange("a", "b");
        session.record_failure();
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.failure_count(), 0);
    }

    #[test]
    fn test_history_messages_limited_to_recent_pairs() {
        let mut session = Session::new("s1", 16);
        session.append_exchange("a", "b");
        session.append_exchange("c", "d");
        let history = session.history_messages(1);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "c");
        assert_eq!(history[1].content, "d");
    }

    #[tokio::test]
    async fn test_evict_idle_sessions() {
        let store = InMemorySessionStore::new(16);
        store.get_or_create("idle").await;
        let busy = store.get_or_create("busy").await;

        // Nothing is older than an hour
        assert_eq!(store.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(store.count(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.evict_idle(Duration::from_millis(1)), 1);
        assert!(store.get("idle").await.is_none());
        assert!(store.get("busy").await.is_some());

        drop(busy);
        assert_eq!(store.evict_idle(Duration::from_millis(1)), 1);
        assert_eq!(store.count(), 0);
    }
}
