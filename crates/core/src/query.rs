use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::memory::ConversationMemory;
use crate::models::{AuditEntry, HistoryEntry, RetrievalOptions};
use crate::prompt::PromptBuilder;
use crate::router::{QueryIntent, QueryRouter};
use crate::synthesizer::AnswerSynthesizer;
use crate::traits::{AuditLog, FailureObserver, VectorIndex};
use std::sync::Arc;

/// Question-to-answer pipeline: classify, assemble context, prompt, and
/// synthesize.
///
/// Date-intent queries are answered from conversation history alone and
/// never touch the index; content-intent queries perform exactly one
/// embedding call and one similarity search. Memory append and audit
/// logging run after a successful answer and are best effort: their
/// failure is reported to the observer but never withheld from the user.
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    memory: ConversationMemory,
    audit: Arc<dyn AuditLog>,
    observer: Arc<dyn FailureObserver>,
    router: QueryRouter,
    prompts: PromptBuilder,
    synthesizer: AnswerSynthesizer,
    retrieval: RetrievalOptions,
}

impl QueryPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        memory: ConversationMemory,
        audit: Arc<dyn AuditLog>,
        observer: Arc<dyn FailureObserver>,
        router: QueryRouter,
        synthesizer: AnswerSynthesizer,
        retrieval: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            memory,
            audit,
            observer,
            router,
            prompts: PromptBuilder,
            synthesizer,
            retrieval,
        }
    }

    pub async fn query(&self, text: &str, owner_id: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidArgument("query is empty".to_string()));
        }

        let intent = self.router.classify(text);
        let history = self
            .memory
            .recent(owner_id, self.retrieval.history_depth)
            .await?;
        let history_block = ConversationMemory::render(&history);

        let context_block = match intent {
            QueryIntent::Date => None,
            QueryIntent::Content => {
                let vector = self.embedder.embed(text).await?;
                let hits = self.index.search(&vector, self.retrieval.top_k).await?;
                let joined = hits
                    .iter()
                    .map(|hit| hit.payload.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined)
            }
        };

        let prompt = self
            .prompts
            .build(intent, &history_block, context_block.as_deref(), text);
        let answer = self.synthesizer.answer(intent, &prompt).await?;

        tracing::debug!(owner_id, ?intent, "query answered");

        if let Err(error) = self.memory.append(owner_id, text, &answer).await {
            self.observer.best_effort_failure("query", "memory", &error);
        }
        let entry = AuditEntry::new(format!("query '{text}' answered"), owner_id);
        if let Err(error) = self.audit.record(&entry).await {
            self.observer.best_effort_failure("query", "audit", &error);
        }

        Ok(answer)
    }

    pub async fn list_history(&self, owner_id: &str) -> Result<Vec<HistoryEntry>> {
        self.memory.all_for_owner(owner_id).await
    }
}
