//! Task digest: render the owner's task list and mail it.

pub mod mailer;
pub mod render;

pub use mailer::{MailConfig, MailRelay, SmtpRelay};
pub use render::{DigestRow, digest_rows, order_tasks, priority_color, render_digest};

use tracing::{Instrument, error, info, info_span};

use crate::error::PipelineError;
use crate::store::Database;

pub const DIGEST_SUBJECT: &str = "Your Task Digest";

/// Read the owner's tasks, render them, and send one message to `target`.
///
/// Returns the number of tasks included. The failure cause is logged here;
/// callers should only surface a generic message.
pub async fn send_digest(
    db: &dyn Database,
    relay: &dyn MailRelay,
    owner_id: &str,
    target: &str,
) -> Result<usize, PipelineError> {
    let span = info_span!("digest", owner = owner_id);
    async move {
        let tasks = db.list_tasks(owner_id).await.map_err(|e| {
            error!(error = %e, "Failed to load tasks for digest");
            e
        })?;

        let html = render_digest(&tasks);
        relay
            .send_html(target, DIGEST_SUBJECT, &html)
            .await
            .map_err(|e| {
                error!(error = %e, to = target, "Digest delivery failed");
                e
            })?;

        info!(count = tasks.len(), "Digest sent");
        Ok(tasks.len())
    }
    .instrument(span)
    .await
}
