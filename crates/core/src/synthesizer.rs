use crate::error::{RagError, Result};
use crate::models::SynthesizerOptions;
use crate::router::QueryIntent;
use crate::traits::ChatModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat client speaking the OpenAI chat-completions protocol; works with
/// the OpenAI API, Groq, Ollama, vLLM, or any compatible endpoint.
/// Exactly one attempt per call: retrying is the caller's decision.
pub struct OpenAiChatClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiChatClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system",
                content: system_prompt,
            }],
            max_tokens,
            temperature,
        };

        let mut request = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.endpoint.trim_end_matches('/')
            ))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| RagError::Generation(error.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::Generation(format!(
                "chat endpoint returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| RagError::Generation(error.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| RagError::Generation("chat response carried no content".to_string()))
    }
}

/// Sends the assembled prompt to the chat collaborator and returns the
/// trimmed answer. Content answers get the larger token budget since
/// they carry retrieved context; date answers only restate a timestamp.
pub struct AnswerSynthesizer {
    chat: Arc<dyn ChatModel>,
    options: SynthesizerOptions,
}

impl AnswerSynthesizer {
    pub fn new(chat: Arc<dyn ChatModel>, options: SynthesizerOptions) -> Self {
        Self { chat, options }
    }

    pub async fn answer(&self, intent: QueryIntent, prompt: &str) -> Result<String> {
        let max_tokens = match intent {
            QueryIntent::Date => self.options.date_max_tokens,
            QueryIntent::Content => self.options.content_max_tokens,
        };

        let answer = self
            .chat
            .complete(prompt, max_tokens, self.options.temperature)
            .await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingChat {
        calls: Mutex<Vec<(u32, f32)>>,
    }

    #[async_trait]
    impl ChatModel for RecordingChat {
        async fn complete(
            &self,
            _system_prompt: &str,
            max_tokens: u32,
            temperature: f32,
        ) -> Result<String> {
            self.calls.lock().unwrap().push((max_tokens, temperature));
            Ok("  an answer with padding  ".to_string())
        }
    }

    #[tokio::test]
    async fn budgets_follow_intent_and_answers_are_trimmed() {
        let chat = Arc::new(RecordingChat {
            calls: Mutex::new(Vec::new()),
        });
        let synthesizer = AnswerSynthesizer::new(
            chat.clone(),
            SynthesizerOptions {
                temperature: 0.6,
                date_max_tokens: 120,
                content_max_tokens: 200,
            },
        );

        let date_answer = synthesizer.answer(QueryIntent::Date, "p").await.unwrap();
        let content_answer = synthesizer.answer(QueryIntent::Content, "p").await.unwrap();

        assert_eq!(date_answer, "an answer with padding");
        assert_eq!(content_answer, "an answer with padding");

        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(120, 0.6), (200, 0.6)]);
    }

    struct FailingChat;

    #[async_trait]
    impl ChatModel for FailingChat {
        async fn complete(&self, _p: &str, _m: u32, _t: f32) -> Result<String> {
            Err(RagError::Generation("provider down".to_string()))
        }
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_generation_error() {
        let synthesizer =
            AnswerSynthesizer::new(Arc::new(FailingChat), SynthesizerOptions::default());
        let result = synthesizer.answer(QueryIntent::Content, "p").await;
        assert!(matches!(result, Err(RagError::Generation(_))));
    }
}
