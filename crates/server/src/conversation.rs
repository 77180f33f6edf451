//! Conversation contexts for the credit chat
//!
//! One context per business identifier, held in process memory. Creation is
//! atomic under the map's write lock and exchanges on one key are serialised
//! by the conversation's own lock, so concurrent first use never loses turns.
//! The map is bounded: idle conversations expire and, when full, the least
//! recently used one is evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{watch, Mutex};

use creditai_config::ChatConfig;
use creditai_core::{Turn, TurnMetadata};
use creditai_llm::{GenerationResult, LlmBackend, LlmError};

/// Conversation key for a chat payload
///
/// The payload's `business_id` when it is a string, else `fallback`.
pub fn conversation_key(business_data: &Value, fallback: &str) -> String {
    business_data
        .get("business_id")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// One business's chat history
pub struct Conversation {
    pub key: String,
    history: Mutex<Vec<Turn>>,
    pub created_at: Instant,
    last_activity: RwLock<Instant>,
}

impl Conversation {
    fn new(key: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            key: key.into(),
            history: Mutex::new(Vec::new()),
            created_at: now,
            last_activity: RwLock::new(now),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.read()
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    /// Snapshot of the turns so far
    pub async fn turns(&self) -> Vec<Turn> {
        self.history.lock().await.clone()
    }

    /// Send `prompt` with the prior turns and record the exchange
    ///
    /// The history only grows when generation succeeds.
    pub async fn exchange(
        &self,
        prompt: String,
        llm: &dyn LlmBackend,
    ) -> Result<GenerationResult, LlmError> {
        let mut history = self.history.lock().await;
        self.touch();

        let mut turns = history.clone();
        turns.push(Turn::user(prompt));

        let result = llm.generate(&turns).await?;

        let metadata = TurnMetadata::new()
            .with_model(llm.model_name())
            .with_latency(result.total_time_ms);
        turns.push(Turn::assistant(result.text.clone()).with_metadata(metadata));
        *history = turns;

        self.touch();
        Ok(result)
    }
}

/// Bounded map of conversations keyed by business identifier
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
    max_conversations: usize,
    idle_timeout: Duration,
    cleanup_interval: Duration,
}

impl ConversationStore {
    pub fn new(max_conversations: usize) -> Self {
        Self::with_config(
            max_conversations,
            Duration::from_secs(3600),
            Duration::from_secs(300),
        )
    }

    pub fn with_config(
        max_conversations: usize,
        idle_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_conversations: max_conversations.max(1),
            idle_timeout,
            cleanup_interval,
        }
    }

    pub fn from_settings(chat: &ChatConfig) -> Self {
        Self::with_config(
            chat.max_conversations,
            Duration::from_secs(chat.idle_timeout_seconds),
            Duration::from_secs(chat.cleanup_interval_seconds),
        )
    }

    /// Start a background task that periodically drops idle conversations.
    ///
    /// Returns a shutdown sender that stops the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(self);
        let interval = store.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = store.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = store.count(),
                                "Conversation cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Conversation cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Existing conversation for `key`, or a new empty one
    pub fn get_or_create(&self, key: &str) -> Arc<Conversation> {
        let mut conversations = self.conversations.write();

        if let Some(existing) = conversations.get(key) {
            existing.touch();
            return existing.clone();
        }

        if conversations.len() >= self.max_conversations {
            Self::cleanup_expired_internal(&mut conversations, self.idle_timeout);
        }
        if conversations.len() >= self.max_conversations {
            Self::evict_least_recent(&mut conversations);
        }

        let conversation = Arc::new(Conversation::new(key));
        conversations.insert(key.to_string(), conversation.clone());
        tracing::debug!(key, total = conversations.len(), "Created conversation");
        conversation
    }

    pub fn get(&self, key: &str) -> Option<Arc<Conversation>> {
        self.conversations.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.conversations.write().remove(key).is_some()
    }

    pub fn count(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.max_conversations
    }

    /// Drop idle conversations; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut conversations = self.conversations.write();
        Self::cleanup_expired_internal(&mut conversations, self.idle_timeout)
    }

    fn cleanup_expired_internal(
        conversations: &mut HashMap<String, Arc<Conversation>>,
        timeout: Duration,
    ) -> usize {
        let before = conversations.len();
        conversations.retain(|_, c| !c.is_expired(timeout));
        before - conversations.len()
    }

    fn evict_least_recent(conversations: &mut HashMap<String, Arc<Conversation>>) {
        let oldest = conversations
            .iter()
            .min_by_key(|(_, c)| c.last_activity())
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            conversations.remove(&key);
            tracing::info!(key = %key, "Evicted least recently used conversation");
        }
    }
}
