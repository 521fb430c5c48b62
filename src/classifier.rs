//! Reply-candidate classification
//!
//! Pure decision over a fetched message; performs no I/O.

use crate::models::{Message, ReplyDecision, SkipReason};

/// Classification policy
///
/// The baseline rule treats any message without a thread identifier as owed
/// a reply. `handled_label_id`, when set, additionally skips messages that
/// already carry the handled label.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    handled_label_id: Option<String>,
}

impl Classifier {
    /// Baseline classifier: thread-id absence is the only signal
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Classifier that also treats the handled label as authoritative
    pub fn skipping_handled(label_id: impl Into<String>) -> Self {
        Self {
            handled_label_id: Some(label_id.into()),
        }
    }

    pub fn classify<'a>(&self, message: &'a Message) -> ReplyDecision<'a> {
        if let Some(label_id) = &self.handled_label_id
            && message.has_label(label_id)
        {
            return ReplyDecision::Skip(SkipReason::AlreadyHandled);
        }
        if message.thread_id.is_some() {
            return ReplyDecision::Skip(SkipReason::AlreadyThreaded);
        }
        ReplyDecision::NeedsReply(message)
    }
}
