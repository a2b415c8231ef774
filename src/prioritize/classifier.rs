//! Classifier adapter. Asks the LLM to assign a priority tier to open tasks.

use std::sync::Arc;

use tracing::info;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::todos::model::Task;

/// Configuration for classifier calls.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// LLM temperature.
    pub temperature: f32,
    /// Max tokens for the reply.
    pub max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a task prioritization assistant. Assign every task \
     exactly one priority: High, Medium, or Low.\n\n\
     Respond with a JSON array containing one object per task, each with:\n\
     - \"id\": the task's integer id, copied exactly\n\
     - \"priority\": one of \"High\", \"Medium\", \"Low\"\n\n\
     Example output:\n\
     [{\"id\": 1, \"priority\": \"High\"}, {\"id\": 2, \"priority\": \"Low\"}]\n\n\
     ONLY output the JSON array. No other text.";

/// Sends open tasks to the external classifier.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, config: ClassifierConfig) -> Self {
        Self { llm, config }
    }

    /// The user message enumerating each task's id and text, one JSON object per line.
    pub fn build_prompt(tasks: &[Task]) -> String {
        let mut prompt = String::from("Tasks:\n");
        for task in tasks {
            let line = serde_json::json!({ "id": task.id, "text": task.text });
            prompt.push_str(&line.to_string());
            prompt.push('\n');
        }
        prompt
    }

    /// The complete request sent for `tasks`.
    pub fn build_request(&self, tasks: &[Task]) -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::build_prompt(tasks)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
    }

    /// One classifier call; returns the raw reply text.
    pub async fn classify(&self, tasks: &[Task]) -> Result<String, LlmError> {
        info!(
            count = tasks.len(),
            model = self.llm.model_name(),
            "Requesting priority classification"
        );

        let response = self.llm.complete(self.build_request(tasks)).await?;

        info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Classifier replied"
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Role;
    use crate::test_support::{StubLlm, task};

    #[test]
    fn prompt_enumerates_ids_and_text() {
        let tasks = vec![task(3, "alice", "buy \"oat\" milk"), task(7, "alice", "file taxes")];
        let prompt = Classifier::build_prompt(&tasks);

        assert!(prompt.starts_with("Tasks:\n"));
        assert!(prompt.contains(r#"{"id":3,"text":"buy \"oat\" milk"}"#));
        assert!(prompt.contains(r#"{"id":7,"text":"file taxes"}"#));
    }

    #[test]
    fn request_carries_schema_hint_and_config() {
        let classifier = Classifier::new(
            StubLlm::replying("[]"),
            ClassifierConfig {
                temperature: 0.2,
                max_tokens: 300,
            },
        );
        let request = classifier.build_request(&[task(1, "alice", "x")]);

        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("\"High\", \"Medium\", \"Low\""));
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_tokens, Some(300));
    }

    #[tokio::test]
    async fn classify_returns_raw_reply_from_one_call() {
        let llm = StubLlm::replying("```json\n[]\n```");
        let classifier = Classifier::new(llm.clone(), ClassifierConfig::default());

        let reply = classifier.classify(&[task(1, "alice", "x")]).await.unwrap();
        assert_eq!(reply, "```json\n[]\n```");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn classify_propagates_transport_failure() {
        let classifier = Classifier::new(StubLlm::failing(), ClassifierConfig::default());
        let err = classifier.classify(&[task(1, "alice", "x")]).await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }
}
