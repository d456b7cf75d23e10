pub mod http;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::SyncError;
use crate::filter::FilterSet;
use crate::models::{Ticket, TicketId};

pub use http::HttpTicketApi;

/// Body of the paginated ticket search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub page: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub group_title: String,
    pub sort_by: String,
    pub order: String,
    pub attributes: FilterSet,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TicketPage {
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Remote ticket endpoints.
pub trait TicketApi: Send + Sync + 'static {
    fn search_tickets(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<TicketPage, SyncError>> + Send;

    fn get_ticket(&self, id: TicketId) -> impl Future<Output = Result<Ticket, SyncError>> + Send;
}
