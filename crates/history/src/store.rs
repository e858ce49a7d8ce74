//! The `ConversationStore` contract and its in-memory implementation.
//!
//! ## Append semantics (shared by every store)
//!
//! 1. Derive the turn id from `(user_id, content)`
//! 2. If a stored turn has that id, replace it in place; the expiry is untouched
//! 3. Otherwise push it at the newest end, evict the oldest turns beyond the
//!    capacity, and restart the conversation's TTL
//!
//! An expired conversation reads as empty and is dropped on the next access.

use crate::error::Result;
use crate::types::{Role, Turn};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Turns kept per conversation unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 10;

/// Conversation lifetime unless configured otherwise
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest gap between sweeps of expired conversations
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Size and lifetime bounds of one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

impl HistoryLimits {
    /// A capacity of zero is raised to one
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Stored state for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub turns: VecDeque<Turn>,
    pub expires_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(limits: &HistoryLimits, now: DateTime<Utc>) -> Self {
        Self {
            turns: VecDeque::with_capacity(limits.capacity),
            expires_at: limits.expiry_from(now),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Apply one append, see the module docs
    pub fn push(&mut self, turn: Turn, limits: &HistoryLimits, now: DateTime<Utc>) {
        if let Some(existing) = self.turns.iter_mut().find(|t| t.id == turn.id) {
            *existing = turn;
            return;
        }

        self.turns.push_back(turn);
        while self.turns.len() > limits.capacity {
            self.turns.pop_front();
        }
        self.expires_at = limits.expiry_from(now);
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}

/// Per-user bounded conversation history.
///
/// Keys are independent: operations on different users never contend.
/// Concurrent writes for the same user are serialized by the store;
/// for two appends with the same identity the last writer wins.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a turn for `user_id`
    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<()>;

    /// Stored turns, oldest first. Empty when unknown or expired.
    async fn recent(&self, user_id: &str) -> Result<Vec<Turn>>;

    /// Drop a user's conversation; true when something was removed
    async fn clear(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        (**self).append(user_id, role, content).await
    }

    async fn recent(&self, user_id: &str) -> Result<Vec<Turn>> {
        (**self).recent(user_id).await
    }

    async fn clear(&self, user_id: &str) -> Result<bool> {
        (**self).clear(user_id).await
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store on a `DashMap`.
///
/// Each user's conversation lives in its own shard entry, and all mutation
/// happens while holding that entry's write guard. Appends periodically sweep
/// out every expired conversation, so users who never return do not linger.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: DashMap<String, Conversation>,
    limits: HistoryLimits,
    /// Unix millis of the last sweep
    last_sweep: AtomicI64,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: HistoryLimits) -> Self {
        Self {
            conversations: DashMap::new(),
            limits,
            last_sweep: AtomicI64::new(0),
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Number of users with a stored (possibly expired) conversation
    pub fn user_count(&self) -> usize {
        self.conversations.len()
    }

    /// Drop expired conversations if the sweep interval (the TTL, at most a
    /// minute) has passed. Must not be called while holding a map guard.
    fn sweep_expired(&self, now: DateTime<Utc>) {
        let interval = self.limits.ttl.min(MAX_SWEEP_INTERVAL).as_millis() as i64;
        let now_ms = now.timestamp_millis();
        let last = self.last_sweep.load(Ordering::Acquire);
        if now_ms - last < interval {
            return;
        }
        // Another caller won the race and is sweeping
        if self
            .last_sweep
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let before = self.conversations.len();
        self.conversations
            .retain(|_, conversation| !conversation.is_expired(now));
        let removed = before.saturating_sub(self.conversations.len());
        if removed > 0 {
            debug!(removed, "Swept expired conversations");
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        let now = Utc::now();
        self.sweep_expired(now);
        let turn = Turn::new(user_id, role, content);

        let mut entry = self
            .conversations
            .entry(user_id.to_string())
            .or_insert_with(|| Conversation::new(&self.limits, now));
        if entry.is_expired(now) {
            *entry = Conversation::new(&self.limits, now);
        }
        entry.push(turn, &self.limits, now);

        debug!(user_id, turns = entry.turns.len(), "Appended {} turn", role);
        Ok(())
    }

    async fn recent(&self, user_id: &str) -> Result<Vec<Turn>> {
        let now = Utc::now();
        match self.conversations.get(user_id) {
            None => return Ok(Vec::new()),
            Some(conversation) if !conversation.is_expired(now) => {
                return Ok(conversation.to_vec());
            }
            Some(_) => {}
        }

        // Read guard is released above; removing while holding it would deadlock
        self.conversations
            .remove_if(user_id, |_, conversation| conversation.is_expired(now));
        debug!(user_id, "Conversation expired");
        Ok(Vec::new())
    }

    async fn clear(&self, user_id: &str) -> Result<bool> {
        Ok(self.conversations.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_read_in_order() {
        let store = InMemoryConversationStore::new();
        store.append("u1", Role::User, "Who directed Heat?").await.unwrap();
        store.append("u1", Role::Assistant, "Michael Mann.").await.unwrap();

        let turns = store.recent("u1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "Michael Mann.");
        assert!(store.recent("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_content_is_stored_once() {
        let store = InMemoryConversationStore::new();
        store.append("u1", Role::User, "Tell me about Alien").await.unwrap();
        store.append("u1", Role::Assistant, "It is a 1979 film.").await.unwrap();
        store.append("u1", Role::User, "Tell me about Alien").await.unwrap();

        let turns = store.recent("u1").await.unwrap();
        assert_eq!(turns.len(), 2);
        // Replaced in place, not moved to the end
        assert_eq!(turns[0].content, "Tell me about Alien");
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_capacity_keeps_most_recent() {
        let store = InMemoryConversationStore::with_limits(HistoryLimits::new(3, DEFAULT_TTL));
        for i in 0..5 {
            store.append("u1", Role::User, &format!("message {}", i)).await.unwrap();
        }

        let contents: Vec<String> = store
            .recent("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_expired_users_are_swept_on_append() {
        let store = InMemoryConversationStore::with_limits(HistoryLimits::new(
            10,
            Duration::from_millis(100),
        ));
        for i in 0..200 {
            store
                .append(&format!("idle-{}", i), Role::User, "hello")
                .await
                .unwrap();
        }
        assert_eq!(store.user_count(), 200);

        tokio::time::sleep(Duration::from_millis(150)).await;
        store.append("active", Role::User, "still here").await.unwrap();

        assert_eq!(store.user_count(), 1);
        assert_eq!(store.recent("active").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_conversation_reads_empty() {
        let store = InMemoryConversationStore::with_limits(HistoryLimits::new(
            10,
            Duration::from_millis(30),
        ));
        store.append("u1", Role::User, "hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(store.recent("u1").await.unwrap().is_empty());
        assert_eq!(store.user_count(), 0);

        // A new append starts a fresh conversation
        store.append("u1", Role::User, "again").await.unwrap();
        assert_eq!(store.recent("u1").await.unwrap().len(), 1);
    }

    #[test]
    fn test_replace_does_not_extend_ttl() {
        let limits = HistoryLimits::new(10, Duration::from_secs(60));
        let start = Utc::now();
        let mut conversation = Conversation::new(&limits, start);
        conversation.push(Turn::new("u", Role::User, "a"), &limits, start);
        let expiry = conversation.expires_at;

        let later = start + TimeDelta::seconds(30);
        conversation.push(Turn::new("u", Role::User, "a"), &limits, later);
        assert_eq!(conversation.expires_at, expiry);

        conversation.push(Turn::new("u", Role::User, "b"), &limits, later);
        assert!(conversation.expires_at > expiry);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryConversationStore::new();
        store.append("u1", Role::User, "hi").await.unwrap();
        assert!(store.clear("u1").await.unwrap());
        assert!(!store.clear("u1").await.unwrap());
        assert!(store.recent("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_bounded() {
        let store = Arc::new(InMemoryConversationStore::with_limits(HistoryLimits::new(
            5,
            DEFAULT_TTL,
        )));
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append("shared", Role::User, &format!("msg {}", i % 8))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let turns = store.recent("shared").await.unwrap();
        assert!(turns.len() <= 5);
        let ids: std::collections::HashSet<_> = turns.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), turns.len());
    }
}
