//! Dispatch and tagging
//!
//! Drives classify → compose → send → tag for one message. Tagging happens
//! only after a successful send, so a message is never marked handled
//! without a reply, and a reply whose tag failed is reported as
//! [`TriageOutcome::TagFailed`] rather than success. No retries.

use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::composer;
use crate::mailbox::{MailboxClient, SendRequest};
use crate::models::{Label, Message, ReplyDecision, TriageOutcome, TriageResult};

/// Per-message reply coordinator
///
/// Holds only read-only policy; the handled label is passed per call.
pub struct Coordinator<'a, M: MailboxClient + ?Sized> {
    mailbox: &'a M,
    classifier: Classifier,
    reply_body: String,
}

impl<'a, M: MailboxClient + ?Sized> Coordinator<'a, M> {
    pub fn new(mailbox: &'a M, classifier: Classifier, reply_body: impl Into<String>) -> Self {
        Self {
            mailbox,
            classifier,
            reply_body: reply_body.into(),
        }
    }

    /// Process one fetched message
    ///
    /// Never fails: every error is folded into the returned outcome.
    pub async fn process(&self, message: &Message, handled_label: &Label) -> TriageResult {
        let outcome = self.dispatch(message, handled_label).await;
        match &outcome {
            TriageOutcome::Replied { reply_id } => {
                info!(message_id = %message.id, reply_id = %reply_id, "replied and tagged");
            }
            TriageOutcome::SkippedNotCandidate(reason) => {
                debug!(
                    message_id = %message.id,
                    fetched_at = %message.fetched_at,
                    ?reason,
                    "skipped"
                );
            }
            TriageOutcome::TagFailed { reply_id, error } => {
                warn!(
                    message_id = %message.id,
                    reply_id = %reply_id,
                    error = %error,
                    "reply sent but tagging failed; message needs manual attention"
                );
            }
            TriageOutcome::MalformedMessage(error)
            | TriageOutcome::FetchFailed(error)
            | TriageOutcome::SendFailed(error) => {
                warn!(message_id = %message.id, outcome = outcome.kind(), error = %error, "message not replied");
            }
        }
        TriageResult::new(message.id.clone(), outcome)
    }

    async fn dispatch(&self, message: &Message, handled_label: &Label) -> TriageOutcome {
        let candidate = match self.classifier.classify(message) {
            ReplyDecision::Skip(reason) => return TriageOutcome::SkippedNotCandidate(reason),
            ReplyDecision::NeedsReply(candidate) => candidate,
        };

        let reply = match composer::compose(candidate, &self.reply_body) {
            Ok(reply) => reply,
            Err(error) => return TriageOutcome::MalformedMessage(error),
        };

        debug!(
            message_id = %message.id,
            from = %reply.from,
            to = %reply.to,
            subject = %reply.subject,
            body_len = reply.body.len(),
            thread_id = %reply.thread_id,
            "sending reply"
        );
        let request = SendRequest {
            raw: reply.raw,
            thread_id: reply.thread_id,
        };
        let receipt = match self.mailbox.send(&request).await {
            Ok(receipt) => receipt,
            Err(error) => return TriageOutcome::SendFailed(error),
        };
        debug!(reply_id = %receipt.id, thread_id = ?receipt.thread_id, "reply sent");

        match self
            .mailbox
            .modify_labels(&message.id, std::slice::from_ref(&handled_label.id))
            .await
        {
            Ok(()) => TriageOutcome::Replied {
                reply_id: receipt.id,
            },
            Err(error) => TriageOutcome::TagFailed {
                reply_id: receipt.id,
                error,
            },
        }
    }
}
