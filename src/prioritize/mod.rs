//! Priority reconciliation pipeline.
//!
//! Classifier → sanitizer → reconciler → atomic store update. Each call to
//! [`Prioritizer::prioritize`] runs the whole pipeline once for one owner;
//! nothing is shared between runs except the injected store and LLM.

pub mod classifier;
pub mod reconciler;
pub mod sanitizer;

pub use classifier::{Classifier, ClassifierConfig};
pub use reconciler::{ValidatedUpdate, is_valid_candidate, reconcile};
pub use sanitizer::{PriorityCandidate, sanitize_reply};

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::llm::LlmProvider;
use crate::store::Database;

/// What a classifier reply amounts to once sanitized and reconciled.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedReply {
    /// At least one update survived validation.
    Updates(Vec<ValidatedUpdate>),
    /// Parsed fine, but nothing usable (not an array, or every entry malformed).
    Empty,
    /// The reply was not parseable JSON.
    ParseFailure(String),
}

impl ClassifiedReply {
    pub fn from_reply(raw: &str) -> Self {
        let candidates = match sanitize_reply(raw) {
            Ok(candidates) => candidates,
            Err(PipelineError::ParseFailure(reason)) => return ClassifiedReply::ParseFailure(reason),
            Err(other) => return ClassifiedReply::ParseFailure(other.to_string()),
        };

        let updates = reconcile(&candidates);
        if updates.is_empty() {
            ClassifiedReply::Empty
        } else {
            ClassifiedReply::Updates(updates)
        }
    }
}

/// Non-error results of a prioritization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrioritizeOutcome {
    /// The owner has no open tasks; the classifier was not called.
    NothingToPrioritize,
    /// The classifier replied but no update was usable.
    NoValidUpdates,
    /// Updates were committed.
    Prioritized { updated: usize },
}

impl PrioritizeOutcome {
    /// Caller-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            PrioritizeOutcome::NothingToPrioritize => "No open tasks to prioritize",
            PrioritizeOutcome::NoValidUpdates => "No updates performed",
            PrioritizeOutcome::Prioritized { .. } => "Tasks prioritized successfully",
        }
    }
}

/// Runs the prioritization pipeline against an injected store and classifier.
pub struct Prioritizer {
    db: Arc<dyn Database>,
    classifier: Classifier,
}

impl Prioritizer {
    pub fn new(db: Arc<dyn Database>, llm: Arc<dyn LlmProvider>, config: ClassifierConfig) -> Self {
        Self {
            db,
            classifier: Classifier::new(llm, config),
        }
    }

    /// Classify the owner's open tasks and apply the result atomically.
    pub async fn prioritize(&self, owner_id: &str) -> Result<PrioritizeOutcome, PipelineError> {
        let span = info_span!("prioritize", run_id = %Uuid::new_v4(), owner = owner_id);
        self.run(owner_id).instrument(span).await
    }

    async fn run(&self, owner_id: &str) -> Result<PrioritizeOutcome, PipelineError> {
        let open = self.db.list_open_tasks(owner_id).await?;
        if open.is_empty() {
            info!("No open tasks, skipping classifier");
            return Ok(PrioritizeOutcome::NothingToPrioritize);
        }

        let raw = self.classifier.classify(&open).await.map_err(|e| {
            error!(error = %e, "Classifier call failed");
            e
        })?;

        match ClassifiedReply::from_reply(&raw) {
            ClassifiedReply::ParseFailure(reason) => {
                warn!(error = %reason, reply = %raw, "Classifier reply is not parseable");
                Err(PipelineError::ParseFailure(reason))
            }
            ClassifiedReply::Empty => {
                info!("Classifier reply held no valid updates");
                Ok(PrioritizeOutcome::NoValidUpdates)
            }
            ClassifiedReply::Updates(updates) => {
                let updated = self
                    .db
                    .apply_priority_updates(owner_id, &updates)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Priority transaction failed");
                        e
                    })?;
                info!(updated, "Tasks prioritized");
                Ok(PrioritizeOutcome::Prioritized { updated })
            }
        }
    }
}
