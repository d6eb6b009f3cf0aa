use crate::models::RouterOptions;

/// Context-assembly strategy for an incoming query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// Answered from conversation history alone; no retrieval.
    Date,
    /// Answered through vector retrieval.
    Content,
}

/// Classifies queries by substring membership in a configurable keyword
/// set denoting temporal intent. A heuristic: false positives and false
/// negatives are accepted behavior.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    keywords: Vec<String>,
}

impl QueryRouter {
    pub fn new(options: RouterOptions) -> Self {
        Self {
            keywords: options
                .date_keywords
                .into_iter()
                .map(|keyword| keyword.to_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, query: &str) -> QueryIntent {
        let lowered = query.to_lowercase();
        if self.keywords.iter().any(|keyword| lowered.contains(keyword)) {
            QueryIntent::Date
        } else {
            QueryIntent::Content
        }
    }
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new(RouterOptions::default())
    }
}
