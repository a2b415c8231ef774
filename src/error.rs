//! Error types for todo-assist.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Mail relay errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid {field} address: {reason}")]
    InvalidAddress { field: &'static str, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP relay error: {0}")]
    Relay(String),
}

/// Failures of the prioritization and digest pipelines.
///
/// `ParseFailure` is the classifier reply being unreadable; every other
/// variant is a service failure of an external collaborator. Empty results
/// are outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Classifier reply is not valid JSON: {0}")]
    ParseFailure(String),

    #[error("Classifier call failed: {0}")]
    Classifier(#[from] LlmError),

    #[error("Task store failed: {0}")]
    Store(#[from] DatabaseError),

    #[error("Mail delivery failed: {0}")]
    Delivery(#[from] MailError),
}

impl PipelineError {
    /// Whether this failure came from an external service rather than the reply text.
    pub fn is_service_failure(&self) -> bool {
        !matches!(self, PipelineError::ParseFailure(_))
    }
}
