use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{SearchRequest, TicketApi, TicketPage};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{Ticket, TicketId};

/// The single-ticket endpoint answers either with the record or with `{ "ticket": record }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TicketResponse {
    Wrapped { ticket: Ticket },
    Bare(Ticket),
}

impl TicketResponse {
    fn into_ticket(self) -> Ticket {
        match self {
            Self::Wrapped { ticket } | Self::Bare(ticket) => ticket,
        }
    }
}

/// HTTP client for the ticket backend
pub struct HttpTicketApi {
    client: reqwest::Client,
    base_url: String,
    search_path: String,
    ticket_path: String,
    auth_token: Option<String>,
}

impl HttpTicketApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = SyncConfig::default();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            search_path: config.search_path,
            ticket_path: config.ticket_path,
            auth_token: None,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        let api = Self {
            client: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            search_path: config.search_path.clone(),
            ticket_path: config.ticket_path.clone(),
            auth_token: None,
        };
        match &config.auth_token {
            Some(token) => api.with_token(token.clone()),
            None => api,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SyncError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl TicketApi for HttpTicketApi {
    async fn search_tickets(&self, request: SearchRequest) -> Result<TicketPage, SyncError> {
        let url = self.url(&self.search_path);
        tracing::debug!(page = request.page, group_title = %request.group_title, "POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, SyncError> {
        let url = self.url(&format!("{}/{}", self.ticket_path.trim_end_matches('/'), id));
        tracing::debug!(ticket_id = id, "GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let ticket: TicketResponse = Self::read_json(response).await?;
        Ok(ticket.into_ticket())
    }
}
