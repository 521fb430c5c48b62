//! Domain types and output DTOs
//!
//! Messages and labels as seen by the pipeline, the classifier decision, the
//! composed reply, per-message triage results, and the serialized run
//! summary envelope.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::errors::AppError;

/// A fetched mailbox message
///
/// Immutable once fetched. Header lookups are case-insensitive; the first
/// occurrence of a header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Mailbox-unique identifier
    pub id: String,
    /// Conversation identifier, if the mailbox reported one
    pub thread_id: Option<String>,
    /// Label ids currently applied to the message
    pub label_ids: Vec<String>,
    /// Header name/value pairs in wire order
    pub headers: Vec<(String, String)>,
    /// Plain text body
    pub body: String,
    /// When the message content was fetched
    pub fetched_at: DateTime<Utc>,
}

impl Message {
    /// Get header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v.as_str()))
    }

    /// Whether the message carries the given label id
    pub fn has_label(&self, label_id: &str) -> bool {
        self.label_ids.iter().any(|l| l == label_id)
    }
}

/// Mailbox label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Opaque label id used in modify calls
    pub id: String,
    /// Display name
    pub name: String,
}

/// Why a message is not a reply candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Message already belongs to a conversation
    AlreadyThreaded,
    /// Message already carries the handled label
    AlreadyHandled,
}

/// Outcome of classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDecision<'a> {
    NeedsReply(&'a Message),
    Skip(SkipReason),
}

/// Reply ready for the mailbox send operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedReply {
    /// Thread the reply is linked to
    pub thread_id: String,
    /// Sender address (the original recipient)
    pub from: String,
    /// Recipient address (the original sender)
    pub to: String,
    pub subject: String,
    pub body: String,
    /// URL-safe, unpadded base64 of the textual envelope
    pub raw: String,
}

/// Per-message triage outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageOutcome {
    /// Reply sent and handled label applied
    Replied { reply_id: String },
    /// Classifier declined the message
    SkippedNotCandidate(SkipReason),
    /// Required header missing; nothing was sent
    MalformedMessage(AppError),
    /// Message content could not be fetched; nothing was sent
    FetchFailed(AppError),
    /// Send failed; tagging was not attempted
    SendFailed(AppError),
    /// Reply sent, tagging failed; needs manual attention
    TagFailed { reply_id: String, error: AppError },
}

impl TriageOutcome {
    /// Stable outcome kind for logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Replied { .. } => "replied",
            Self::SkippedNotCandidate(_) => "skipped_not_candidate",
            Self::MalformedMessage(_) => "malformed_message",
            Self::FetchFailed(_) => "fetch_failed",
            Self::SendFailed(_) => "send_failed",
            Self::TagFailed { .. } => "tag_failed",
        }
    }

    fn error(&self) -> Option<&AppError> {
        match self {
            Self::MalformedMessage(e) | Self::FetchFailed(e) | Self::SendFailed(e) => Some(e),
            Self::TagFailed { error, .. } => Some(error),
            Self::Replied { .. } | Self::SkippedNotCandidate(_) => None,
        }
    }
}

/// Result of processing one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageResult {
    pub message_id: String,
    pub outcome: TriageOutcome,
}

impl TriageResult {
    pub fn new(message_id: impl Into<String>, outcome: TriageOutcome) -> Self {
        Self {
            message_id: message_id.into(),
            outcome,
        }
    }
}

/// Counts per outcome kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub replied: usize,
    pub skipped_not_candidate: usize,
    pub malformed_message: usize,
    pub fetch_failed: usize,
    pub send_failed: usize,
    pub tag_failed: usize,
}

impl OutcomeCounts {
    /// Tally outcomes
    pub fn from_results(results: &[TriageResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.outcome {
                TriageOutcome::Replied { .. } => counts.replied += 1,
                TriageOutcome::SkippedNotCandidate(_) => counts.skipped_not_candidate += 1,
                TriageOutcome::MalformedMessage(_) => counts.malformed_message += 1,
                TriageOutcome::FetchFailed(_) => counts.fetch_failed += 1,
                TriageOutcome::SendFailed(_) => counts.send_failed += 1,
                TriageOutcome::TagFailed { .. } => counts.tag_failed += 1,
            }
        }
        counts
    }

    /// Number of messages that ended in any failure kind
    pub fn failures(&self) -> usize {
        self.malformed_message + self.fetch_failed + self.send_failed + self.tag_failed
    }
}

/// Summary of one triage pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of ids returned by the listing
    pub listed: usize,
    /// Results in processing order
    pub results: Vec<TriageResult>,
    pub counts: OutcomeCounts,
    /// Whether the pass stopped early on a cancellation signal
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(listed: usize, results: Vec<TriageResult>, cancelled: bool) -> Self {
        let counts = OutcomeCounts::from_results(&results);
        Self {
            listed,
            results,
            counts,
            cancelled,
        }
    }

    /// One-line human readable summary
    pub fn headline(&self) -> String {
        let c = &self.counts;
        format!(
            "{} replied, {} skipped, {} failed ({} tag failure(s) need attention){}",
            c.replied,
            c.skipped_not_candidate,
            c.failures(),
            c.tag_failed,
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}

/// Serialized form of a per-message result
#[derive(Debug, Clone, Serialize)]
pub struct MessageReport {
    pub message_id: String,
    pub outcome: &'static str,
    pub reply_id: Option<String>,
    pub skip_reason: Option<SkipReason>,
    pub error_code: Option<&'static str>,
    pub error: Option<String>,
}

impl From<&TriageResult> for MessageReport {
    fn from(result: &TriageResult) -> Self {
        let reply_id = match &result.outcome {
            TriageOutcome::Replied { reply_id } | TriageOutcome::TagFailed { reply_id, .. } => {
                Some(reply_id.clone())
            }
            _ => None,
        };
        let skip_reason = match result.outcome {
            TriageOutcome::SkippedNotCandidate(reason) => Some(reason),
            _ => None,
        };
        let error = result.outcome.error();
        Self {
            message_id: result.message_id.clone(),
            outcome: result.outcome.kind(),
            reply_id,
            skip_reason,
            error_code: error.map(AppError::code),
            error: error.map(ToString::to_string),
        }
    }
}

/// Serialized run data
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub handled_label: String,
    pub listed: usize,
    pub processed: usize,
    pub cancelled: bool,
    pub counts: OutcomeCounts,
    pub messages: Vec<MessageReport>,
}

impl RunReport {
    pub fn new(handled_label: &str, summary: &RunSummary) -> Self {
        Self {
            handled_label: handled_label.to_owned(),
            listed: summary.listed,
            processed: summary.results.len(),
            cancelled: summary.cancelled,
            counts: summary.counts,
            messages: summary.results.iter().map(MessageReport::from).collect(),
        }
    }
}

/// Metadata included in the run envelope
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    /// Per-run correlation id
    pub run_id: String,
    /// Current UTC timestamp in RFC 3339 format with milliseconds
    pub now_utc: String,
    /// Run duration in milliseconds
    pub duration_ms: u64,
}

impl Meta {
    pub fn now(run_id: &str, duration_ms: u64) -> Self {
        Self {
            run_id: run_id.to_owned(),
            now_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms,
        }
    }
}

/// Standard output envelope
///
/// Wraps run data with a human-readable summary and execution metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RunEnvelope<T> {
    pub summary: String,
    pub data: T,
    pub meta: Meta,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        Message, MessageReport, OutcomeCounts, RunSummary, SkipReason, TriageOutcome, TriageResult,
    };
    use crate::errors::AppError;

    fn results() -> Vec<TriageResult> {
        vec![
            TriageResult::new(
                "m1",
                TriageOutcome::Replied {
                    reply_id: "r1".to_owned(),
                },
            ),
            TriageResult::new(
                "m2",
                TriageOutcome::SkippedNotCandidate(SkipReason::AlreadyThreaded),
            ),
            TriageResult::new(
                "m3",
                TriageOutcome::TagFailed {
                    reply_id: "r3".to_owned(),
                    error: AppError::Transport("503".to_owned()),
                },
            ),
        ]
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_first_wins() {
        let message = Message {
            id: "m1".to_owned(),
            thread_id: None,
            label_ids: vec!["INBOX".to_owned()],
            headers: vec![
                ("subject".to_owned(), "first".to_owned()),
                ("Subject".to_owned(), "second".to_owned()),
            ],
            body: String::new(),
            fetched_at: Utc::now(),
        };
        assert_eq!(message.header("SUBJECT"), Some("first"));
        assert_eq!(message.header("From"), None);
        assert!(message.has_label("INBOX"));
    }

    #[test]
    fn counts_tally_each_outcome_kind() {
        let counts = OutcomeCounts::from_results(&results());
        assert_eq!(counts.replied, 1);
        assert_eq!(counts.skipped_not_candidate, 1);
        assert_eq!(counts.tag_failed, 1);
        assert_eq!(counts.failures(), 1);
    }

    #[test]
    fn headline_flags_partial_state_and_cancellation() {
        let summary = RunSummary::new(5, results(), true);
        assert_eq!(
            summary.headline(),
            "1 replied, 1 skipped, 1 failed (1 tag failure(s) need attention), cancelled"
        );
    }

    #[test]
    fn tag_failure_report_keeps_reply_id_and_error_code() {
        let all = results();
        let report = MessageReport::from(&all[2]);
        assert_eq!(report.outcome, "tag_failed");
        assert_eq!(report.reply_id.as_deref(), Some("r3"));
        assert_eq!(report.error_code, Some("transport"));

        let json = serde_json::to_value(MessageReport::from(&all[1])).expect("serializes");
        assert_eq!(json["skip_reason"], "already_threaded");
    }
}
