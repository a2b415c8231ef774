//! Shared fakes for unit tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::digest::MailRelay;
use crate::error::{LlmError, MailError};
use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::todos::model::{Priority, Task};

/// LLM provider that returns a canned reply and counts calls.
pub struct StubLlm {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl StubLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(content) => Ok(CompletionResponse {
                content: content.clone(),
                ..Default::default()
            }),
            None => Err(LlmError::RequestFailed {
                provider: "stub".into(),
                reason: "connection refused".into(),
            }),
        }
    }
}

/// A message captured by `RecordingRelay`.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mail relay that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingRelay {
    pub fail: bool,
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailRelay for RecordingRelay {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Relay("535 5.7.8 authentication failed for smtp-user".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// An open, unprioritized task.
pub fn task(id: i64, owner: &str, text: &str) -> Task {
    let now = Utc::now();
    Task {
        id,
        owner_id: owner.to_string(),
        text: text.to_string(),
        completed: false,
        priority: None,
        created_at: now,
        updated_at: now,
    }
}

/// A task with explicit completion and priority.
pub fn task_with(id: i64, text: &str, completed: bool, priority: Option<Priority>) -> Task {
    Task {
        completed,
        priority,
        ..task(id, "alice", text)
    }
}
