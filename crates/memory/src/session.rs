//! Working memory (L1): the recent messages of each chat session.
//!
//! An explicit service owned by whoever wires the engine. Sessions are
//! created lazily on first append, trimmed to a fixed capacity, and expired
//! by a background sweeper once idle for longer than the TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use affinity_core::message::{Message, SessionId};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

struct Session {
    messages: VecDeque<Message>,
    last_active: DateTime<Utc>,
}

/// In-process store of per-session message windows.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    capacity: usize,
}

impl SessionStore {
    /// `capacity` is the number of messages kept per session (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append messages to a session, creating it if needed, then trim the
    /// oldest so at most `capacity` remain.
    pub async fn append(&self, session: &SessionId, messages: impl IntoIterator<Item = Message>) {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session.clone()).or_insert_with(|| Session {
            messages: VecDeque::with_capacity(self.capacity + 2),
            last_active: Utc::now(),
        });

        entry.messages.extend(messages);
        while entry.messages.len() > self.capacity {
            entry.messages.pop_front();
        }
        entry.last_active = Utc::now();
    }

    /// The last `n` messages of a session, oldest first. Empty for an
    /// unknown session.
    pub async fn recent(&self, session: &SessionId, n: usize) -> Vec<Message> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session)
            .map(|s| {
                let skip = s.messages.len().saturating_sub(n);
                s.messages.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Every retained message of a session, oldest first.
    pub async fn messages(&self, session: &SessionId) -> Vec<Message> {
        self.recent(session, self.capacity).await
    }

    pub async fn contains(&self, session: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop a session explicitly.
    pub async fn end(&self, session: &SessionId) -> bool {
        self.sessions.write().await.remove(session).is_some()
    }

    /// Drop every session idle for longer than `idle_ttl`. Returns how many
    /// were removed.
    pub async fn sweep_idle(&self, idle_ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(idle_ttl).unwrap_or_else(|_| chrono::Duration::days(3650));
        let cutoff = Utc::now() - ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active >= cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "Swept idle sessions");
        }
        removed
    }

    /// Start the background sweeper. It runs every `interval` until the
    /// returned handle is aborted.
    pub fn spawn_sweeper(&self, interval: Duration, idle_ttl: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        info!(
            interval_secs = interval.as_secs(),
            idle_ttl_secs = idle_ttl.as_secs(),
            "Starting working-memory sweeper"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                store.sweep_idle(idle_ttl).await;
            }
        })
    }

    #[cfg(test)]
    async fn backdate(&self, session: &SessionId, by: chrono::Duration) {
        if let Some(s) = self.sessions.write().await.get_mut(session) {
            s.last_active -= by;
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[tokio::test]
    async fn keeps_only_last_capacity_messages() {
        let store = SessionStore::new(10);
        let session = sid("s1");
        for i in 0..11 {
            store.append(&session, [Message::user(format!("m{i}"))]).await;
        }

        let messages = store.messages(&session).await;
        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0].content, "m1");
        assert_eq!(messages[9].content, "m10");
    }

    #[tokio::test]
    async fn recent_returns_tail_in_order() {
        let store = SessionStore::new(10);
        let session = sid("s1");
        store
            .append(
                &session,
                [Message::user("a"), Message::assistant("b"), Message::user("c")],
            )
            .await;

        let tail = store.recent(&session, 2).await;
        let contents: Vec<_> = tail.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new(4);
        store.append(&sid("a"), [Message::user("only a")]).await;
        assert!(store.recent(&sid("b"), 6).await.is_empty());
        assert_eq!(store.recent(&sid("a"), 6).await.len(), 1);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let store = SessionStore::new(0);
        assert_eq!(store.capacity(), 1);
        store.append(&sid("s"), [Message::user("x"), Message::user("y")]).await;
        assert_eq!(store.messages(&sid("s")).await[0].content, "y");
    }

    #[tokio::test]
    async fn sweep_drops_only_idle_sessions() {
        let store = SessionStore::new(10);
        store.append(&sid("old"), [Message::user("hi")]).await;
        store.append(&sid("fresh"), [Message::user("hi")]).await;
        store.backdate(&sid("old"), chrono::Duration::hours(3)).await;

        let removed = store.sweep_idle(Duration::from_secs(7200)).await;
        assert_eq!(removed, 1);
        assert!(!store.contains(&sid("old")).await);
        assert!(store.contains(&sid("fresh")).await);
    }

    #[tokio::test]
    async fn end_removes_session() {
        let store = SessionStore::default();
        store.append(&sid("s"), [Message::user("hi")]).await;
        assert!(store.end(&sid("s")).await);
        assert!(!store.end(&sid("s")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_in_background() {
        let store = SessionStore::new(10);
        store.append(&sid("old"), [Message::user("hi")]).await;
        store.backdate(&sid("old"), chrono::Duration::hours(3)).await;

        let handle = store.spawn_sweeper(Duration::from_secs(60), Duration::from_secs(7200));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(!store.contains(&sid("old")).await);
        handle.abort();
    }
}
