//! Triage pass over a bounded batch of inbox messages
//!
//! Resolves the handled label once, lists message ids, applies the hold-back
//! window, then fetches and processes each message sequentially. A
//! cancellation signal is honored between messages only, so a send/tag pair
//! that has started always completes.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::config::TriageConfig;
use crate::coordinator::Coordinator;
use crate::errors::{AppError, AppResult};
use crate::mailbox::{ListRequest, MailboxClient};
use crate::models::{Label, RunSummary, TriageOutcome, TriageResult};

/// Triage pipeline bound to one mailbox and configuration
pub struct TriagePipeline<'a, M: MailboxClient + ?Sized> {
    mailbox: &'a M,
    config: &'a TriageConfig,
}

impl<'a, M: MailboxClient + ?Sized> TriagePipeline<'a, M> {
    pub fn new(mailbox: &'a M, config: &'a TriageConfig) -> Self {
        Self { mailbox, config }
    }

    /// Find the configured handled label by exact display name
    ///
    /// # Errors
    ///
    /// - `LabelNotFound` if no label has the configured name
    /// - transport errors from the label listing
    pub async fn resolve_handled_label(&self) -> AppResult<Label> {
        let labels = self.mailbox.list_labels().await?;
        find_label(labels, &self.config.handled_label)
    }

    /// Run one triage pass
    ///
    /// Lists at most `batch_limit` ids and processes all but the trailing
    /// `hold_back` of them, in listed order.
    ///
    /// # Errors
    ///
    /// Only run-level failures are returned (label resolution, listing).
    /// Per-message failures are recorded in the summary.
    pub async fn run(&self, batch_limit: usize, cancel: &CancellationToken) -> AppResult<RunSummary> {
        let started = Instant::now();
        let handled_label = self.resolve_handled_label().await?;
        info!(label = %handled_label.name, label_id = %handled_label.id, "resolved handled label");

        let request = ListRequest {
            max_results: batch_limit,
            label_ids: if self.config.source_label.is_empty() {
                Vec::new()
            } else {
                vec![self.config.source_label.clone()]
            },
        };
        let listed = self.mailbox.list_message_ids(&request).await?;
        let ids = window(&listed, self.config.hold_back);
        info!(
            listed = listed.len(),
            selected = ids.len(),
            hold_back = self.config.hold_back,
            "starting triage pass"
        );

        let classifier = if self.config.skip_handled {
            Classifier::skipping_handled(handled_label.id.clone())
        } else {
            Classifier::baseline()
        };
        let coordinator = Coordinator::new(self.mailbox, classifier, self.config.reply_body.clone());

        let mut results = Vec::with_capacity(ids.len());
        let mut cancelled = false;
        for id in ids {
            if cancel.is_cancelled() {
                warn!(processed = results.len(), remaining = ids.len() - results.len(), "triage pass cancelled");
                cancelled = true;
                break;
            }

            let result = match self.mailbox.get_message(id).await {
                Ok(message) => coordinator.process(&message, &handled_label).await,
                Err(error) => {
                    warn!(message_id = %id, error = %error, "failed to fetch message");
                    TriageResult::new(id.clone(), TriageOutcome::FetchFailed(error))
                }
            };
            results.push(result);
        }

        let summary = RunSummary::new(listed.len(), results, cancelled);
        info!(
            replied = summary.counts.replied,
            skipped = summary.counts.skipped_not_candidate,
            failed = summary.counts.failures(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "triage pass finished"
        );
        Ok(summary)
    }
}

/// Case-sensitive label lookup by display name
fn find_label(labels: Vec<Label>, name: &str) -> AppResult<Label> {
    labels
        .into_iter()
        .find(|l| l.name == name)
        .ok_or_else(|| AppError::LabelNotFound(format!("no label named '{name}' in mailbox")))
}

/// Leading ids left after holding back the trailing `hold_back`
fn window(ids: &[String], hold_back: usize) -> &[String] {
    &ids[..ids.len().saturating_sub(hold_back)]
}
