use crate::router::QueryIntent;

/// Substituted for the retrieved-context block when retrieval returned
/// nothing.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No additional context.";

/// Assembles the single system-role prompt from conversation history,
/// optional retrieved context, and the raw query. Two fixed templates,
/// selected by intent; both end with the literal query and an expected-
/// answer marker cueing the model to produce only the answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(
        &self,
        intent: QueryIntent,
        history_block: &str,
        context_block: Option<&str>,
        query: &str,
    ) -> String {
        match intent {
            QueryIntent::Date => self.date_prompt(history_block, query),
            QueryIntent::Content => {
                let context = match context_block {
                    Some(block) if !block.trim().is_empty() => block,
                    _ => NO_CONTEXT_PLACEHOLDER,
                };
                self.content_prompt(history_block, context, query)
            }
        }
    }

    /// History-only template: instructs the model to answer with the
    /// exact timestamp of the matching history entry. No document
    /// context is included.
    fn date_prompt(&self, history_block: &str, query: &str) -> String {
        format!(
            "Act as an artificial-intelligence assistant specialized in document analysis.\n\
             Use the following conversation history to answer the user's question precisely.\n\
             Keep an approachable, cordial, and helpful tone when answering the user.\n\
             \n\
             **Conversation history:**\n\
             {history_block}\n\
             \n\
             **Additional instruction:**\n\
             - If the question concerns dates, answer with the exact date the question was asked.\n\
             - Dates are in the format: YYYY-MM-DD HH:MM:SS.\n\
             \n\
             **Question:** {query}\n\
             **Expected answer:**"
        )
    }

    fn content_prompt(&self, history_block: &str, context_block: &str, query: &str) -> String {
        format!(
            "Act as an artificial-intelligence assistant specialized in document analysis.\n\
             Use the following information to answer the user's question precisely.\n\
             Keep an approachable, cordial, and helpful tone when answering the user.\n\
             \n\
             **Conversation history:**\n\
             {history_block}\n\
             \n\
             **Relevant context:**\n\
             {context_block}\n\
             \n\
             **Question:** {query}\n\
             **Expected answer:**"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{PromptBuilder, NO_CONTEXT_PLACEHOLDER};
    use crate::router::QueryIntent;

    #[test]
    fn content_prompt_includes_retrieved_context() {
        let prompt = PromptBuilder.build(
            QueryIntent::Content,
            "- **Date:** 2026-01-01 00:00:00",
            Some("clause 4.2 allows termination with 30 days notice"),
            "What does the contract say about termination?",
        );

        assert!(prompt.contains("**Relevant context:**"));
        assert!(prompt.contains("clause 4.2 allows termination with 30 days notice"));
        assert!(prompt.ends_with("**Expected answer:**"));
        assert!(prompt.contains("**Question:** What does the contract say about termination?"));
    }

    #[test]
    fn empty_retrieval_substitutes_placeholder() {
        let prompt = PromptBuilder.build(QueryIntent::Content, "", Some("   "), "anything?");
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));

        let prompt = PromptBuilder.build(QueryIntent::Content, "", None, "anything?");
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));
    }

    #[test]
    fn date_prompt_has_timestamp_instruction_and_no_context_block() {
        let prompt = PromptBuilder.build(
            QueryIntent::Date,
            "- **Date:** 2026-01-01 00:00:00",
            Some("retrieved text that must not appear"),
            "when did I upload it?",
        );

        assert!(prompt.contains("YYYY-MM-DD HH:MM:SS"));
        assert!(!prompt.contains("**Relevant context:**"));
        assert!(!prompt.contains("retrieved text that must not appear"));
        assert!(prompt.ends_with("**Expected answer:**"));
    }
}
