//! Mailbox client abstraction
//!
//! The pipeline only talks to a remote mailbox through [`MailboxClient`].
//! [`crate::gmail::GmailClient`] is the production implementation; tests use
//! the in-memory [`fake::FakeMailbox`].

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::{Label, Message};

/// Parameters for listing message identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Upper bound on the number of ids returned
    pub max_results: usize,
    /// Only list messages carrying all of these label ids
    pub label_ids: Vec<String>,
}

/// Payload for the send operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// URL-safe base64 envelope
    pub raw: String,
    /// Conversation the reply belongs to
    pub thread_id: String,
}

/// Delivery confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Identifier of the newly created message
    pub id: String,
    pub thread_id: Option<String>,
}

/// Remote mailbox operations consumed by the pipeline
///
/// Every operation may fail with a transport error. Implementations own
/// their timeouts.
#[async_trait]
pub trait MailboxClient: Send + Sync {
    async fn list_labels(&self) -> AppResult<Vec<Label>>;

    /// List message ids in the mailbox's natural ordering
    async fn list_message_ids(&self, request: &ListRequest) -> AppResult<Vec<String>>;

    async fn get_message(&self, id: &str) -> AppResult<Message>;

    async fn send(&self, request: &SendRequest) -> AppResult<SendReceipt>;

    async fn modify_labels(&self, id: &str, add_label_ids: &[String]) -> AppResult<()>;
}

#[cfg(test)]
pub mod fake {
    //! In-memory mailbox recording every call

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::{ListRequest, MailboxClient, SendReceipt, SendRequest};
    use crate::errors::{AppError, AppResult};
    use crate::models::{Label, Message};

    /// Recorded mailbox call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        ListLabels,
        ListMessageIds(ListRequest),
        GetMessage(String),
        Send(SendRequest),
        ModifyLabels { id: String, add: Vec<String> },
    }

    #[derive(Debug, Default)]
    struct State {
        order: Vec<String>,
        messages: HashMap<String, Message>,
        calls: Vec<Call>,
        sent: usize,
    }

    /// Fake mailbox
    ///
    /// A successful send threads the original message into the reply's
    /// conversation, the way the real service does.
    #[derive(Debug, Default)]
    pub struct FakeMailbox {
        labels: Vec<Label>,
        state: Mutex<State>,
        fail_send: bool,
        fail_tag: bool,
        fail_get: HashSet<String>,
    }

    impl FakeMailbox {
        pub fn new(labels: Vec<Label>) -> Self {
            Self {
                labels,
                ..Self::default()
            }
        }

        pub fn with_important_label() -> Self {
            Self::new(vec![
                label("INBOX", "INBOX"),
                label("Label_42", "IMPORTANT"),
            ])
        }

        pub fn failing_send(mut self) -> Self {
            self.fail_send = true;
            self
        }

        pub fn failing_tag(mut self) -> Self {
            self.fail_tag = true;
            self
        }

        pub fn failing_get(mut self, id: &str) -> Self {
            self.fail_get.insert(id.to_owned());
            self
        }

        pub fn insert(&self, message: Message) {
            let mut state = self.state.lock().expect("fake mailbox lock");
            state.order.push(message.id.clone());
            state.messages.insert(message.id.clone(), message);
        }

        pub fn message(&self, id: &str) -> Option<Message> {
            let state = self.state.lock().expect("fake mailbox lock");
            state.messages.get(id).cloned()
        }

        pub fn calls(&self) -> Vec<Call> {
            self.state.lock().expect("fake mailbox lock").calls.clone()
        }

        pub fn send_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Send(_)))
                .count()
        }

        pub fn tag_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::ModifyLabels { .. }))
                .count()
        }

        pub fn fetch_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::GetMessage(_)))
                .count()
        }

        fn record(&self, call: Call) {
            self.state.lock().expect("fake mailbox lock").calls.push(call);
        }
    }

    #[async_trait]
    impl MailboxClient for FakeMailbox {
        async fn list_labels(&self) -> AppResult<Vec<Label>> {
            self.record(Call::ListLabels);
            Ok(self.labels.clone())
        }

        async fn list_message_ids(&self, request: &ListRequest) -> AppResult<Vec<String>> {
            self.record(Call::ListMessageIds(request.clone()));
            let state = self.state.lock().expect("fake mailbox lock");
            Ok(state
                .order
                .iter()
                .take(request.max_results)
                .cloned()
                .collect())
        }

        async fn get_message(&self, id: &str) -> AppResult<Message> {
            self.record(Call::GetMessage(id.to_owned()));
            if self.fail_get.contains(id) {
                return Err(AppError::Transport(format!("get {id} failed")));
            }
            let state = self.state.lock().expect("fake mailbox lock");
            state
                .messages
                .get(id)
                .cloned()
                .map(|mut m| {
                    m.fetched_at = Utc::now();
                    m
                })
                .ok_or_else(|| AppError::NotFound(format!("message {id} not found")))
        }

        async fn send(&self, request: &SendRequest) -> AppResult<SendReceipt> {
            self.record(Call::Send(request.clone()));
            if self.fail_send {
                return Err(AppError::Transport("send rejected with 503".to_owned()));
            }
            let mut state = self.state.lock().expect("fake mailbox lock");
            state.sent += 1;
            let reply_id = format!("reply-{}", state.sent);
            for message in state.messages.values_mut() {
                if message.id == request.thread_id {
                    message.thread_id = Some(request.thread_id.clone());
                }
            }
            Ok(SendReceipt {
                id: reply_id,
                thread_id: Some(request.thread_id.clone()),
            })
        }

        async fn modify_labels(&self, id: &str, add_label_ids: &[String]) -> AppResult<()> {
            self.record(Call::ModifyLabels {
                id: id.to_owned(),
                add: add_label_ids.to_vec(),
            });
            if self.fail_tag {
                return Err(AppError::Transport("modify rejected with 500".to_owned()));
            }
            let mut state = self.state.lock().expect("fake mailbox lock");
            let message = state
                .messages
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("message {id} not found")))?;
            for label_id in add_label_ids {
                if !message.has_label(label_id) {
                    message.label_ids.push(label_id.clone());
                }
            }
            Ok(())
        }
    }

    pub fn label(id: &str, name: &str) -> Label {
        Label {
            id: id.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Message with complete headers
    pub fn message(id: &str, thread_id: Option<&str>) -> Message {
        Message {
            id: id.to_owned(),
            thread_id: thread_id.map(str::to_owned),
            label_ids: vec!["INBOX".to_owned()],
            headers: vec![
                ("From".to_owned(), format!("sender-{id}@example.com")),
                ("To".to_owned(), "me@example.com".to_owned()),
                ("Subject".to_owned(), format!("Question {id}")),
            ],
            body: "Hello?".to_owned(),
            fetched_at: Utc::now(),
        }
    }

    /// Message missing the `From` header
    pub fn message_without_from(id: &str) -> Message {
        let mut msg = message(id, None);
        msg.headers.retain(|(k, _)| k != "From");
        msg
    }
}
