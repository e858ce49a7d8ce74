//! Conversation store persisted as one JSON document per user.
//!
//! Documents live under a directory, named by the hex SHA-256 of the user id
//! so arbitrary ids map to safe file names. Writes go to a temporary file and
//! are renamed into place.

use crate::error::{Result, StoreError};
use crate::store::{Conversation, ConversationStore, HistoryLimits};
use crate::types::{Role, Turn};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// `ConversationStore` that survives process restarts
#[derive(Debug)]
pub struct FileConversationStore {
    dir: PathBuf,
    limits: HistoryLimits,
    /// One lock per user: read-modify-write of a document is never interleaved
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileConversationStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>, limits: HistoryLimits) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            limits,
            locks: DashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let digest = Sha256::digest(user_id.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}.json", name))
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the user's lock once nobody else holds or waits on it
    fn release_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn append_locked(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        let now = Utc::now();
        let path = self.path_for(user_id);
        let mut conversation = match self.load(user_id, &path).await {
            Ok(Some(conversation)) if !conversation.is_expired(now) => conversation,
            Ok(_) => Conversation::new(&self.limits, now),
            Err(StoreError::Corrupt { reason, .. }) => {
                warn!(user_id, "Discarding unreadable conversation: {}", reason);
                Conversation::new(&self.limits, now)
            }
            Err(e) => return Err(e),
        };

        conversation.push(Turn::new(user_id, role, content), &self.limits, now);
        self.save(&path, &conversation).await?;

        debug!(user_id, turns = conversation.turns.len(), "Persisted {} turn", role);
        Ok(())
    }

    async fn recent_locked(&self, user_id: &str) -> Result<Vec<Turn>> {
        let path = self.path_for(user_id);
        match self.load(user_id, &path).await? {
            Some(conversation) if !conversation.is_expired(Utc::now()) => Ok(conversation.to_vec()),
            Some(_) => {
                debug!(user_id, "Conversation expired");
                tokio::fs::remove_file(&path).await?;
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn load(&self, user_id: &str, path: &Path) -> Result<Option<Conversation>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, path: &Path, conversation: &Conversation) -> Result<()> {
        let json = serde_json::to_vec_pretty(conversation)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<()> {
        let lock = self.lock_for(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.append_locked(user_id, role, content).await
        };
        self.release_lock(user_id, lock);
        result
    }

    async fn recent(&self, user_id: &str) -> Result<Vec<Turn>> {
        let lock = self.lock_for(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.recent_locked(user_id).await
        };
        self.release_lock(user_id, lock);
        result
    }

    async fn clear(&self, user_id: &str) -> Result<bool> {
        let lock = self.lock_for(user_id);
        let result = {
            let _guard = lock.lock().await;
            match tokio::fs::remove_file(self.path_for(user_id)).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            }
        };
        self.release_lock(user_id, lock);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_TTL;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileConversationStore::open(dir.path(), HistoryLimits::default()).unwrap();
            store.append("alice", Role::User, "Is Heat any good?").await.unwrap();
            store.append("alice", Role::Assistant, "Yes.").await.unwrap();
        }

        let store = FileConversationStore::open(dir.path(), HistoryLimits::default()).unwrap();
        let turns = store.recent("alice").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "Is Heat any good?");
    }

    #[tokio::test]
    async fn test_same_semantics_as_memory_store() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::open(dir.path(), HistoryLimits::new(2, DEFAULT_TTL)).unwrap();

        store.append("bob", Role::User, "one").await.unwrap();
        store.append("bob", Role::User, "one").await.unwrap();
        assert_eq!(store.recent("bob").await.unwrap().len(), 1);

        store.append("bob", Role::User, "two").await.unwrap();
        store.append("bob", Role::User, "three").await.unwrap();
        let contents: Vec<_> = store
            .recent("bob")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_user_ids_map_to_safe_file_names() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::open(dir.path(), HistoryLimits::default()).unwrap();
        store.append("../../etc/passwd", Role::User, "hi").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(store.clear("../../etc/passwd").await.unwrap());
        assert!(!store.clear("../../etc/passwd").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let store = FileConversationStore::open(dir.path(), HistoryLimits::default()).unwrap();
        std::fs::write(store.path_for("carol"), b"{not json").unwrap();

        assert!(matches!(
            store.recent("carol").await,
            Err(StoreError::Corrupt { .. })
        ));
        // Appending starts over
        store.append("carol", Role::User, "hello").await.unwrap();
        assert_eq!(store.recent("carol").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_locks_are_released() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            FileConversationStore::open(dir.path(), HistoryLimits::default()).unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("user-{}", i % 5);
                store.append(&user, Role::User, &format!("message {}", i)).await.unwrap();
                store.recent(&user).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(store.locks.is_empty());
        assert!(store.clear("user-0").await.unwrap());
        assert!(store.locks.is_empty());
    }

    #[tokio::test]
    async fn test_expired_document_is_removed() {
        let dir = TempDir::new().unwrap();
        let store =
            FileConversationStore::open(dir.path(), HistoryLimits::new(10, Duration::from_millis(20)))
                .unwrap();
        store.append("dave", Role::User, "hi").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.recent("dave").await.unwrap().is_empty());
        assert!(!store.path_for("dave").exists());
    }
}
