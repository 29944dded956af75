use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub mod model;

pub use model::{Conversation, Message, Page, Participant, ParticipantList};

use model::AccessTokenResponse;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/";

/// Field lists requested from the Graph API; exactly what the harvester and
/// the serving layer consume, nothing more.
const CONVERSATION_FIELDS: &str = "participants,updated_time,message_count,unread_count";
const MESSAGE_FIELDS: &str = "message,created_time,from,to";

#[derive(Debug, Error)]
pub enum GraphError {
    /// Network-level failure reaching the platform.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success HTTP status, with whatever body the platform returned.
    #[error("graph api error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// A 200 response whose body did not decode as expected.
    #[error("invalid graph response: {0}")]
    Decode(#[from] serde_json::Error),
    /// A 200 response missing a field the caller depends on.
    #[error("missing `{0}` in graph response")]
    MissingField(&'static str),
    #[error("invalid graph url: {0}")]
    InvalidUrl(String),
}

/// Transport seam for the Graph API. [`GraphClient`] implements it over
/// reqwest; tests substitute scripted stubs.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Token introspection. `Ok` means the platform answered 200; the body is
    /// not inspected beyond that.
    async fn debug_token(&self, input_token: &str, access_token: &str) -> Result<(), GraphError>;

    /// Exchange a short-lived user token for a long-lived one.
    async fn exchange_long_lived(
        &self,
        client_id: &str,
        client_secret: &str,
        user_token: &str,
    ) -> Result<String, GraphError>;

    /// Fetch the page-scoped access token for `page_id`, authorized by a
    /// long-lived user token.
    async fn page_access_token(
        &self,
        page_id: &str,
        long_lived_token: &str,
    ) -> Result<String, GraphError>;

    /// One page of conversation threads for `page_id`.
    async fn conversations(
        &self,
        page_token: &str,
        page_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Conversation>, GraphError>;

    /// One page of messages for a conversation.
    async fn messages(
        &self,
        page_token: &str,
        conversation_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Message>, GraphError>;
}

#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Client against the real Graph host for the given API version
    /// (e.g. `v18.0`). `timeout` applies to every request.
    pub fn new(api_version: &str, timeout: Duration) -> Self {
        let base_url = Url::parse(GRAPH_API_BASE)
            .and_then(|base| base.join(&format!("{}/", api_version)))
            .expect("valid default graph URL");
        Self::with_base_url(base_url, timeout)
    }

    /// Client against an arbitrary base (tests, local mocks). The base must
    /// end with `/` so endpoint paths join underneath it.
    pub fn with_base_url(base_url: Url, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("fb-pageharvest/0.1")
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self { http, base_url }
    }

    fn build_get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Request, GraphError> {
        let endpoint = self
            .base_url
            .join(path)
            .map_err(|err| GraphError::InvalidUrl(err.to_string()))?;
        Ok(self.http.get(endpoint).query(query).build()?)
    }

    fn debug_token_request(
        &self,
        input_token: &str,
        access_token: &str,
    ) -> Result<reqwest::Request, GraphError> {
        self.build_get(
            "debug_token",
            &[("input_token", input_token), ("access_token", access_token)],
        )
    }

    fn exchange_request(
        &self,
        client_id: &str,
        client_secret: &str,
        user_token: &str,
    ) -> Result<reqwest::Request, GraphError> {
        self.build_get(
            "oauth/access_token",
            &[
                ("grant_type", "fb_exchange_token"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("fb_exchange_token", user_token),
            ],
        )
    }

    fn page_token_request(
        &self,
        page_id: &str,
        long_lived_token: &str,
    ) -> Result<reqwest::Request, GraphError> {
        self.build_get(
            page_id,
            &[("access_token", long_lived_token), ("fields", "access_token")],
        )
    }

    fn conversations_request(
        &self,
        page_token: &str,
        page_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<reqwest::Request, GraphError> {
        let limit = limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("access_token", page_token),
            ("limit", &limit),
            ("fields", CONVERSATION_FIELDS),
        ];
        if let Some(cursor) = after {
            query.push(("after", cursor));
        }
        self.build_get(&format!("{}/conversations", page_id), &query)
    }

    fn messages_request(
        &self,
        page_token: &str,
        conversation_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<reqwest::Request, GraphError> {
        let limit = limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("access_token", page_token),
            ("limit", &limit),
            ("fields", MESSAGE_FIELDS),
        ];
        if let Some(cursor) = after {
            query.push(("after", cursor));
        }
        self.build_get(&format!("{}/messages", conversation_id), &query)
    }

    /// Send a request and reject non-success statuses. Bodies of failed
    /// responses are logged, never parsed.
    async fn execute_checked(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, GraphError> {
        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "graph api error: {message}");
            return Err(GraphError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(res)
    }

    /// Shared tail of the two token-exchange endpoints: a 200 body that must
    /// carry a non-empty `access_token`.
    async fn read_access_token(
        &self,
        request: reqwest::Request,
    ) -> Result<String, GraphError> {
        let res = self.execute_checked(request).await?;
        let body = res.text().await?;
        let payload: AccessTokenResponse = serde_json::from_str(&body)?;
        payload
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(GraphError::MissingField("access_token"))
    }

    pub async fn debug_token(
        &self,
        input_token: &str,
        access_token: &str,
    ) -> Result<(), GraphError> {
        let request = self.debug_token_request(input_token, access_token)?;
        self.execute_checked(request).await?;
        Ok(())
    }

    pub async fn exchange_long_lived(
        &self,
        client_id: &str,
        client_secret: &str,
        user_token: &str,
    ) -> Result<String, GraphError> {
        let request = self.exchange_request(client_id, client_secret, user_token)?;
        self.read_access_token(request).await
    }

    pub async fn page_access_token(
        &self,
        page_id: &str,
        long_lived_token: &str,
    ) -> Result<String, GraphError> {
        let request = self.page_token_request(page_id, long_lived_token)?;
        self.read_access_token(request).await
    }

    pub async fn conversations(
        &self,
        page_token: &str,
        page_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Conversation>, GraphError> {
        let request = self.conversations_request(page_token, page_id, limit, after)?;
        let res = self.execute_checked(request).await?;
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn messages(
        &self,
        page_token: &str,
        conversation_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Message>, GraphError> {
        let request = self.messages_request(page_token, conversation_id, limit, after)?;
        let res = self.execute_checked(request).await?;
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl GraphApi for GraphClient {
    async fn debug_token(&self, input_token: &str, access_token: &str) -> Result<(), GraphError> {
        GraphClient::debug_token(self, input_token, access_token).await
    }

    async fn exchange_long_lived(
        &self,
        client_id: &str,
        client_secret: &str,
        user_token: &str,
    ) -> Result<String, GraphError> {
        GraphClient::exchange_long_lived(self, client_id, client_secret, user_token).await
    }

    async fn page_access_token(
        &self,
        page_id: &str,
        long_lived_token: &str,
    ) -> Result<String, GraphError> {
        GraphClient::page_access_token(self, page_id, long_lived_token).await
    }

    async fn conversations(
        &self,
        page_token: &str,
        page_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Conversation>, GraphError> {
        GraphClient::conversations(self, page_token, page_id, limit, after).await
    }

    async fn messages(
        &self,
        page_token: &str,
        conversation_id: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<Message>, GraphError> {
        GraphClient::messages(self, page_token, conversation_id, limit, after).await
    }
}
