//! Reply composition and transport encoding
//!
//! Builds the acknowledgment addressed back to the original sender and
//! serializes it into the textual envelope expected by the send API:
//! header lines, a blank line, then the body, joined with `\n` and encoded
//! as URL-safe base64 without padding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::errors::{AppError, AppResult};
use crate::models::{ComposedReply, Message};

/// Compose a reply to `message` with the given body text
///
/// Sender and recipient are swapped from the original; the subject is kept
/// verbatim. The reply is threaded on the original thread id, or on the
/// message's own id when it has none.
///
/// # Errors
///
/// Returns `MalformedMessage` when `From`, `To`, or `Subject` is missing.
pub fn compose(message: &Message, body: &str) -> AppResult<ComposedReply> {
    let original_from = required_header(message, "From")?;
    let original_to = required_header(message, "To")?;
    let subject = required_header(message, "Subject")?;

    let thread_id = message
        .thread_id
        .clone()
        .unwrap_or_else(|| message.id.clone());

    let from = original_to.to_owned();
    let to = original_from.to_owned();
    let subject = subject.to_owned();
    let body = body.to_owned();
    let raw = encode_envelope(&render_envelope(&from, &to, &subject, &thread_id, &body));

    Ok(ComposedReply {
        thread_id,
        from,
        to,
        subject,
        body,
        raw,
    })
}

/// Render the textual envelope
pub fn render_envelope(from: &str, to: &str, subject: &str, thread_id: &str, body: &str) -> String {
    [
        format!("From: {from}"),
        format!("To: {to}"),
        format!("Subject: {subject}"),
        format!("Thread-Id: {thread_id}"),
        String::new(),
        body.to_owned(),
    ]
    .join("\n")
}

/// Encode an envelope as URL-safe base64 without `=` padding
pub fn encode_envelope(envelope: &str) -> String {
    URL_SAFE_NO_PAD.encode(envelope.as_bytes())
}

fn required_header<'a>(message: &'a Message, name: &str) -> AppResult<&'a str> {
    message.header(name).ok_or_else(|| {
        AppError::MalformedMessage(format!("message {} is missing {name} header", message.id))
    })
}
