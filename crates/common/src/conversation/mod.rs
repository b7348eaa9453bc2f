//! Conversation history store
//!
//! Keeps the last N messages per conversation with idle-TTL eviction.
//! Injected into the pipeline like the caches; lifecycle belongs to the
//! process bootstrap, not ambient module state.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A single conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Speaker role: user or assistant
    pub role: MessageRole,

    /// Message text
    pub content: String,

    /// Wall-clock timestamp
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Conversation history seam
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Get the retained history for a conversation (oldest first)
    async fn get(&self, id: Uuid) -> Result<Vec<Message>>;

    /// Append a message, trimming to the retention bound
    async fn append(&self, id: Uuid, message: Message) -> Result<()>;
}

/// In-memory conversation store, bounded per conversation and TTL-evicted
pub struct MemoryConversationStore {
    inner: Mutex<HashMap<Uuid, ConversationEntry>>,
    max_messages: usize,
    ttl: Duration,
}

struct ConversationEntry {
    messages: VecDeque<Message>,
    last_touched: Instant,
}

impl MemoryConversationStore {
    /// Create a store retaining `max_messages` per conversation with the
    /// given idle TTL
    pub fn new(max_messages: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_messages: max_messages.max(1),
            ttl,
        }
    }

    fn sweep_expired(&self, map: &mut HashMap<Uuid, ConversationEntry>) {
        let ttl = self.ttl;
        map.retain(|_, entry| entry.last_touched.elapsed() < ttl);
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, id: Uuid) -> Result<Vec<Message>> {
        let mut map = self.inner.lock().await;
        self.sweep_expired(&mut map);
        Ok(map
            .get(&id)
            .map(|entry| entry.messages.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn append(&self, id: Uuid, message: Message) -> Result<()> {
        let mut map = self.inner.lock().await;
        self.sweep_expired(&mut map);

        let entry = map.entry(id).or_insert_with(|| ConversationEntry {
            messages: VecDeque::new(),
            last_touched: Instant::now(),
        });

        entry.messages.push_back(message);
        while entry.messages.len() > self.max_messages {
            entry.messages.pop_front();
        }
        entry.last_touched = Instant::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_get() {
        let store = MemoryConversationStore::new(10, Duration::from_secs(60));
        let id = Uuid::new_v4();

        store.append(id, Message::user("hello")).await.unwrap();
        store.append(id, Message::assistant("hi")).await.unwrap();

        let history = store.get(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_retention_bound() {
        let store = MemoryConversationStore::new(3, Duration::from_secs(60));
        let id = Uuid::new_v4();

        for i in 0..5 {
            store.append(id, Message::user(format!("m{}", i))).await.unwrap();
        }

        let history = store.get(id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "m2");
    }

    #[tokio::test]
    async fn test_ttl_eviction() {
        let store = MemoryConversationStore::new(10, Duration::from_millis(10));
        let id = Uuid::new_v4();

        store.append(id, Message::user("hello")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(store.get(id).await.unwrap().is_empty());
    }
}
