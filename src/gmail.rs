//! Gmail REST transport
//!
//! Implements [`MailboxClient`] over the Gmail v1 REST API with `reqwest`.
//! Timeouts come from [`TriageConfig`] and are enforced by the HTTP client;
//! every failure is mapped onto [`AppError`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::Credential;
use crate::config::TriageConfig;
use crate::errors::{AppError, AppResult};
use crate::mailbox::{ListRequest, MailboxClient, SendReceipt, SendRequest};
use crate::mime;
use crate::models::{Label, Message};

/// Largest page the list endpoint accepts
const MAX_LIST_RESULTS: usize = 500;

/// Authenticated Gmail API client
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    credential: Credential,
    /// `{api_base}/users/{user_id}`
    user_base: String,
}

impl GmailClient {
    /// Build a client for the configured user
    ///
    /// # Errors
    ///
    /// - `Internal` if the HTTP client cannot be constructed
    pub fn new(config: &TriageConfig, credential: Credential) -> AppResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            credential,
            user_base: format!(
                "{}/users/{}",
                config.api_base,
                urlencoding::encode(&config.user_id)
            ),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.user_base)
    }

    /// Send a request and decode the JSON response
    async fn execute<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let response = request
            .bearer_auth(self.credential.token())
            .send()
            .await
            .map_err(|e| map_reqwest_error(what, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(what, status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Transport(format!("{what}: invalid response body: {e}")))
    }
}

#[async_trait]
impl MailboxClient for GmailClient {
    async fn list_labels(&self) -> AppResult<Vec<Label>> {
        let response: LabelsResponse = self
            .execute("list labels", self.http.get(self.url("labels")))
            .await?;
        Ok(response
            .labels
            .into_iter()
            .map(|l| Label {
                id: l.id,
                name: l.name,
            })
            .collect())
    }

    async fn list_message_ids(&self, request: &ListRequest) -> AppResult<Vec<String>> {
        let ids = collect_pages(request.max_results.max(1), |page_size, page_token| {
            let query = list_query(request, page_size, page_token.as_deref());
            async move {
                self.execute(
                    "list messages",
                    self.http.get(self.url("messages")).query(&query),
                )
                .await
            }
        })
        .await?;
        debug!(count = ids.len(), "listed message ids");
        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> AppResult<Message> {
        let path = format!("messages/{}", urlencoding::encode(id));
        let response: RawMessageResponse = self
            .execute(
                "get message",
                self.http.get(self.url(&path)).query(&[("format", "raw")]),
            )
            .await?;
        message_from_raw(response)
    }

    async fn send(&self, request: &SendRequest) -> AppResult<SendReceipt> {
        let body = SendBody {
            raw: &request.raw,
            thread_id: &request.thread_id,
        };
        let response: SendResponse = self
            .execute(
                "send message",
                self.http.post(self.url("messages/send")).json(&body),
            )
            .await?;
        Ok(SendReceipt {
            id: response.id,
            thread_id: response.thread_id,
        })
    }

    async fn modify_labels(&self, id: &str, add_label_ids: &[String]) -> AppResult<()> {
        let path = format!("messages/{}/modify", urlencoding::encode(id));
        let body = ModifyBody {
            add_label_ids,
            remove_label_ids: &[],
        };
        let _: serde_json::Value = self
            .execute("modify labels", self.http.post(self.url(&path)).json(&body))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<LabelResource>,
}

#[derive(Debug, Deserialize)]
struct LabelResource {
    id: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessageResponse {
    id: String,
    thread_id: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    raw: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    raw: &'a str,
    thread_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    id: String,
    thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyBody<'a> {
    add_label_ids: &'a [String],
    remove_label_ids: &'a [String],
}

/// Query parameters for one page of the message listing
fn list_query(
    request: &ListRequest,
    page_size: usize,
    page_token: Option<&str>,
) -> Vec<(String, String)> {
    let mut query = vec![("maxResults".to_owned(), page_size.to_string())];
    query.extend(
        request
            .label_ids
            .iter()
            .map(|l| ("labelIds".to_owned(), l.clone())),
    );
    if let Some(token) = page_token {
        query.push(("pageToken".to_owned(), token.to_owned()));
    }
    query
}

/// Follow `nextPageToken` until `wanted` ids are collected or pages run out
///
/// Each page asks for at most [`MAX_LIST_RESULTS`] ids and never more than
/// are still missing.
async fn collect_pages<F, Fut>(wanted: usize, mut fetch_page: F) -> AppResult<Vec<String>>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: Future<Output = AppResult<MessageListResponse>>,
{
    let mut ids = Vec::with_capacity(wanted.min(MAX_LIST_RESULTS));
    let mut page_token = None;
    loop {
        let missing = wanted - ids.len();
        let page = fetch_page(missing.min(MAX_LIST_RESULTS), page_token.take()).await?;
        if page.messages.is_empty() {
            break;
        }
        ids.extend(page.messages.into_iter().map(|m| m.id).take(missing));
        match page.next_page_token {
            Some(token) if !token.is_empty() && ids.len() < wanted => page_token = Some(token),
            _ => break,
        }
    }
    Ok(ids)
}

/// Decode a `format=raw` response into a [`Message`]
///
/// The service may or may not pad the base64url payload; both are accepted.
fn message_from_raw(response: RawMessageResponse) -> AppResult<Message> {
    let bytes = URL_SAFE_NO_PAD
        .decode(response.raw.trim().trim_end_matches('='))
        .map_err(|e| {
            AppError::Transport(format!("message {} has invalid raw payload: {e}", response.id))
        })?;
    let parsed = mime::parse_message(&bytes)?;

    Ok(Message {
        id: response.id,
        thread_id: response.thread_id.filter(|t| !t.is_empty()),
        label_ids: response.label_ids,
        headers: parsed.headers,
        body: parsed.body_text,
        fetched_at: Utc::now(),
    })
}

fn map_reqwest_error(what: &str, error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::Timeout(format!("{what} timed out"))
    } else {
        AppError::Transport(format!("{what} failed: {error}"))
    }
}

fn map_status(what: &str, status: StatusCode, body: &str) -> AppError {
    let detail = error_message(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::AuthenticationFailed(format!("{what}: {detail}"))
        }
        StatusCode::NOT_FOUND => AppError::NotFound(format!("{what}: {detail}")),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AppError::Timeout(format!("{what}: {detail}"))
        }
        _ => AppError::Transport(format!("{what} returned {status}: {detail}")),
    }
}

/// Extract `error.message` from a Google API error body
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_owned)
}
