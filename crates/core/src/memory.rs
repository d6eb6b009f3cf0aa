use crate::error::Result;
use crate::models::HistoryEntry;
use crate::traits::HistoryStore;
use std::sync::Arc;

/// Per-user conversation memory over a [`HistoryStore`]: append one
/// exchange after each successful answer, read back the most recent K
/// when building prompt context.
pub struct ConversationMemory {
    store: Arc<dyn HistoryStore>,
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    pub async fn append(&self, owner_id: &str, query_text: &str, response_text: &str) -> Result<()> {
        let entry = HistoryEntry::new(query_text, response_text, owner_id);
        self.store.append(&entry).await
    }

    pub async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.store.recent(owner_id, limit).await
    }

    pub async fn all_for_owner(&self, owner_id: &str) -> Result<Vec<HistoryEntry>> {
        self.store.all_for_owner(owner_id).await
    }

    /// Renders entries into the fixed prompt block: one three-line unit
    /// per exchange (date, question, answer), newest first, blank-line
    /// separated, trailing whitespace trimmed.
    pub fn render(entries: &[HistoryEntry]) -> String {
        let mut block = String::new();
        for entry in entries {
            block.push_str(&format!(
                "- **Date:** {}\n  **Question:** {}\n  **Answer:** {}\n\n",
                entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                entry.query_text,
                entry.response_text
            ));
        }
        block.trim().to_string()
    }
}
