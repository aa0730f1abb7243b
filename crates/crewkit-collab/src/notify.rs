//! Outbound notification seam.
//!
//! Email delivery is an external collaborator. Services call it
//! fire-and-forget: a failed dispatch is logged and the committed write
//! stands.

use crewkit_core::error::CollabResult;
use tracing::{info, warn};

/// Template identifiers for outbound mail.
pub const TEMPLATE_PROJECT_ADDED: &str = "project-added";
pub const TEMPLATE_INVITATION: &str = "project-invitation";

/// Narrow dispatch interface for outbound notifications.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        to: &str,
        template: &str,
        data: serde_json::Value,
    ) -> impl Future<Output = CollabResult<()>> + Send;
}

/// Default notifier: logs the dispatch instead of sending mail. Used in
/// development and tests.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, to: &str, template: &str, data: serde_json::Value) -> CollabResult<()> {
        info!(to, template, %data, "notification dispatched");
        Ok(())
    }
}

/// Dispatch a notification and swallow any failure with a warning.
pub(crate) async fn send_best_effort<N: Notifier>(
    notifier: &N,
    to: &str,
    template: &str,
    data: serde_json::Value,
) {
    if let Err(err) = notifier.send(to, template, data).await {
        warn!(to, template, %err, "notification dispatch failed");
    }
}
