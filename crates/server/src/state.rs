//! Application State
//!
//! Shared handles injected into every handler.

use std::sync::Arc;

use creditai_config::Settings;
use creditai_llm::LlmBackend;
use creditai_persistence::RecordStore;
use creditai_scoring::Scorer;

use crate::conversation::ConversationStore;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    /// Record store gateway (MySQL or in-memory)
    pub store: Arc<dyn RecordStore>,
    pub scorer: Arc<Scorer>,
    /// Chat contexts keyed by business identifier
    pub conversations: Arc<ConversationStore>,
    pub llm: Arc<dyn LlmBackend>,
}

impl AppState {
    /// Build state; scorer and conversation store come from `config`
    pub fn new(config: Settings, store: Arc<dyn RecordStore>, llm: Arc<dyn LlmBackend>) -> Self {
        let scorer = Arc::new(Scorer::new(&config.scoring));
        let conversations = Arc::new(ConversationStore::from_settings(&config.chat));
        Self {
            config: Arc::new(config),
            store,
            scorer,
            conversations,
            llm,
        }
    }

    /// Replace the scorer
    pub fn with_scorer(mut self, scorer: Arc<Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the conversation store
    pub fn with_conversations(mut self, conversations: Arc<ConversationStore>) -> Self {
        self.conversations = conversations;
        self
    }

    pub fn records_table(&self) -> &str {
        &self.config.tables.records
    }

    pub fn social_table(&self) -> &str {
        &self.config.tables.social
    }
}
