//! Gmail REST client — lists candidate messages and decodes their bodies.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::matching::ExtractionError;

pub mod auth;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
pub const GMAIL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MESSAGE_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("Gmail rejected the access token")]
    Unauthorized,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("credential error: {0}")]
    Credentials(String),
}

impl From<GmailError> for ExtractionError {
    fn from(e: GmailError) -> Self {
        match e {
            GmailError::Unauthorized => ExtractionError::Unauthorized,
            GmailError::Http(ref inner) if inner.is_timeout() => {
                ExtractionError::Timeout(GMAIL_TIMEOUT)
            }
            other => ExtractionError::Upstream(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailMessage {
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// Something that can hand back the HTML (or text) body of a mail message.
#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn message_html(&self, access_token: &str, message_id: &str)
        -> Result<String, GmailError>;
}

#[derive(Clone)]
pub struct GmailClient {
    client: Client,
}

impl GmailClient {
    pub fn new() -> Result<Self, GmailError> {
        Ok(Self {
            client: Client::builder().timeout(GMAIL_TIMEOUT).build()?,
        })
    }

    pub async fn list_messages(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<MessageRef>, GmailError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{GMAIL_API_BASE}/messages"))
            .bearer_auth(sanitize_token(access_token))
            .query(&[("maxResults", limit.as_str()), ("q", query)])
            .send()
            .await?;

        let list: MessageList = check_status(response).await?.json().await?;
        debug!("Gmail returned {} messages for query '{}'", list.messages.len(), query);
        Ok(list.messages)
    }

    /// Address of the mailbox the token belongs to.
    pub async fn account_email(&self, access_token: &str) -> Result<String, GmailError> {
        let response = self
            .client
            .get(format!("{GMAIL_API_BASE}/profile"))
            .bearer_auth(sanitize_token(access_token))
            .send()
            .await?;

        let profile: Profile = check_status(response).await?.json().await?;
        Ok(profile.email_address)
    }

    pub async fn get_message(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<GmailMessage, GmailError> {
        let response = self
            .client
            .get(format!("{GMAIL_API_BASE}/messages/{message_id}"))
            .bearer_auth(sanitize_token(access_token))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn message_html(
        &self,
        access_token: &str,
        message_id: &str,
    ) -> Result<String, GmailError> {
        let message = self.get_message(access_token, message_id).await?;
        Ok(decode_email_body(&message))
    }
}

async fn check_status(response: Response) -> Result<Response, GmailError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(GmailError::Unauthorized);
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GmailError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// Search query for job-related mail in the last `days` days.
pub fn inbox_query(days: u32) -> String {
    format!("subject:(job OR hiring OR role OR position OR vacancy) newer_than:{days}d")
}

/// Cleans up a pasted access token: surrounding whitespace, a `Bearer ` prefix,
/// quotes, or a whole OAuth JSON response.
pub fn sanitize_token(token: &str) -> String {
    let mut t = token.trim();

    if t.starts_with('{') && t.ends_with('}') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(t) {
            if let Some(access) = value.get("access_token").and_then(|v| v.as_str()) {
                return access.to_string();
            }
        }
    }

    if let Some(prefix) = t.get(..7) {
        if prefix.eq_ignore_ascii_case("bearer ") {
            t = t[7..].trim();
        }
    }

    t.trim_matches(['"', '\'', '“', '”']).to_string()
}

/// Returns the decoded message body, preferring `text/html` over `text/plain`
/// and descending into nested multiparts. Undecodable bodies yield "".
pub fn decode_email_body(message: &GmailMessage) -> String {
    let Some(payload) = &message.payload else {
        return String::new();
    };

    let data = match &payload.parts {
        Some(parts) => find_body_part(parts).and_then(part_data),
        None => part_data(payload),
    };

    match data {
        Some(data) => decode_base64url(data),
        None => String::new(),
    }
}

fn part_data(part: &MessagePart) -> Option<&str> {
    part.body
        .as_ref()
        .and_then(|b| b.data.as_deref())
        .filter(|d| !d.is_empty())
}

fn find_body_part(parts: &[MessagePart]) -> Option<&MessagePart> {
    let by_mime = |mime: &str| {
        parts
            .iter()
            .find(|p| p.mime_type.as_deref() == Some(mime))
    };

    by_mime("text/html")
        .or_else(|| by_mime("text/plain"))
        .or_else(|| {
            parts
                .iter()
                .filter_map(|p| p.parts.as_deref())
                .find_map(find_body_part)
        })
}

fn decode_base64url(data: &str) -> String {
    match URL_SAFE_NO_PAD.decode(data.trim().trim_end_matches('=')) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            error!("Failed to decode email body: {e}");
            String::new()
        }
    }
}
