//! Message parsing
//!
//! Parses RFC 822 sources fetched from the mail service using `mailparse`,
//! keeping the header list and the first non-attachment `text/plain` part.

use mailparse::{DispositionType, MailHeader, ParsedMail};

use crate::errors::{AppError, AppResult};

/// Headers and plain text body of a message
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// All headers as key-value pairs in wire order
    pub headers: Vec<(String, String)>,
    /// First plain text body part, empty if none
    pub body_text: String,
}

/// Parse RFC 822 message bytes
///
/// # Errors
///
/// - `Transport` if `mailparse` cannot parse the source
pub fn parse_message(raw: &[u8]) -> AppResult<ParsedMessage> {
    let parsed = mailparse::parse_mail(raw)
        .map_err(|e| AppError::Transport(format!("failed to parse RFC822 message: {e}")))?;

    let headers = to_tuples(&parsed.headers);
    let mut body_text = None;
    walk_parts(&parsed, &mut body_text);

    Ok(ParsedMessage {
        headers,
        body_text: body_text.unwrap_or_default(),
    })
}

/// Walk MIME part tree depth-first looking for a text/plain body
fn walk_parts(part: &ParsedMail<'_>, body_text: &mut Option<String>) {
    if body_text.is_some() {
        return;
    }

    if part.subparts.is_empty() {
        let ctype = part.ctype.mimetype.to_ascii_lowercase();
        let disp = part.get_content_disposition();
        let is_attachment = disp.disposition == DispositionType::Attachment
            || disp.params.contains_key("filename");

        if !is_attachment
            && ctype == "text/plain"
            && let Ok(text) = part.get_body()
        {
            *body_text = Some(text);
        }
        return;
    }

    for sub in &part.subparts {
        walk_parts(sub, body_text);
    }
}

fn to_tuples(headers: &[MailHeader<'_>]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|h| (h.get_key(), h.get_value()))
        .collect()
}
