//! HTTP collaborators: history fetch and credential verification.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use trustline_core::{Credential, Verdict};
use trustline_proto::{ChatFrame, Identity, parse_timestamp};

use crate::{CollaboratorError, CredentialVerifier, HistoryFetcher, transport::TransportConfig};

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    messages: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    sender: String,
    content: String,
    #[serde(default)]
    receiver: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl HistoryEntry {
    /// `None` for entries with no usable sender or no content.
    fn into_frame(self) -> Option<ChatFrame> {
        let sender = Identity::new(self.sender).ok()?;
        if self.content.is_empty() {
            return None;
        }
        Some(ChatFrame {
            sender,
            content: self.content,
            timestamp: self.timestamp.as_deref().and_then(parse_timestamp),
            receiver: self.receiver.and_then(|r| Identity::new(r).ok()),
        })
    }
}

/// REST client for the chat server's history and login endpoints.
#[derive(Debug, Clone)]
pub struct RestCollaborators {
    http: reqwest::Client,
    api_base: Url,
    cookie: String,
}

impl RestCollaborators {
    /// Build a client for `config.api_base`.
    pub fn new(config: &TransportConfig) -> Result<Self, CollaboratorError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| CollaboratorError::Unavailable(format!("invalid address: {e}")))?;
        Ok(Self { http: reqwest::Client::new(), api_base, cookie: config.cookie() })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CollaboratorError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| CollaboratorError::Unavailable("address cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn unavailable(e: &reqwest::Error) -> CollaboratorError {
    CollaboratorError::Unavailable(e.to_string())
}

#[async_trait]
impl HistoryFetcher for RestCollaborators {
    async fn fetch_history(
        &self,
        partner: &Identity,
    ) -> Result<Vec<ChatFrame>, CollaboratorError> {
        let url = self.endpoint(&["api", "messages", partner.as_str()])?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        match response.status() {
            status if status.is_success() => {},
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CollaboratorError::Unauthorized);
            },
            status => return Err(CollaboratorError::Unavailable(format!("status {status}"))),
        }

        let body: HistoryResponse =
            response.json().await.map_err(|e| CollaboratorError::Decode(e.to_string()))?;
        let total = body.messages.len();
        let frames: Vec<_> =
            body.messages.into_iter().filter_map(HistoryEntry::into_frame).collect();
        if frames.len() != total {
            let skipped = total - frames.len();
            tracing::debug!(%partner, skipped, "history entries without sender or content");
        }
        Ok(frames)
    }
}

#[async_trait]
impl CredentialVerifier for RestCollaborators {
    async fn verify(
        &self,
        identity: &Identity,
        credential: &Credential,
    ) -> Result<Verdict, CollaboratorError> {
        let url = self.endpoint(&["api", "login"])?;
        let response = self
            .http
            .post(url)
            .form(&[("username", identity.as_str()), ("password", credential.expose())])
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        match response.status() {
            status if status.is_success() => Ok(Verdict::Verified),
            StatusCode::UNAUTHORIZED => Ok(Verdict::Rejected),
            status => Err(CollaboratorError::Unavailable(format!("status {status}"))),
        }
    }
}
