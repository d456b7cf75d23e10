use super::SyncEngine;
use crate::api::{SearchRequest, TicketApi};
use crate::constants::SEARCH_RESULT_TYPE;
use crate::error::SyncError;
use crate::filter::FilterSet;
use crate::models::Scope;
use crate::push::PushChannel;

/// How a bulk load ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Completed { pages: u32, tickets: usize },
    /// A newer load started before this one finished; its pages were dropped.
    Superseded,
}

impl<A: TicketApi, C: PushChannel> SyncEngine<A, C> {
    /// Bulk load a scope into the main and chat views.
    ///
    /// Both views are emptied first. Pages are fetched one after another until
    /// `total_pages` is reached. A page error aborts the load and leaves what
    /// was merged so far in place. If another load starts meanwhile, this one
    /// stops at its next page boundary and reports `Superseded`.
    pub async fn load(&self, scope: Scope) -> Result<LoadOutcome, SyncError> {
        let group_title = scope.group_title.clone();
        let attributes = self.search_attributes(&scope);
        let token = self.mutate(|state| state.begin_load(scope));
        tracing::info!(token, group_title = %group_title, "loading tickets");

        let mut page = 1;
        let mut tickets = 0;
        loop {
            let request = SearchRequest {
                page,
                kind: SEARCH_RESULT_TYPE.to_string(),
                group_title: group_title.clone(),
                sort_by: self.config.sort_by.clone(),
                order: self.config.order.clone(),
                attributes: attributes.clone(),
            };

            let response = match self.api.search_tickets(request).await {
                Ok(response) => response,
                Err(e) => {
                    let current = self.state.lock().is_current(token);
                    if !current {
                        tracing::debug!(token, page, "stale load failed, ignoring");
                        return Ok(LoadOutcome::Superseded);
                    }
                    tracing::warn!(token, page, group_title = %group_title, error = %e, "ticket load aborted");
                    self.report_failure(format!("load {} page {}", group_title, page), &e);
                    return Err(e);
                }
            };

            let total_pages = response.pagination.total_pages;
            let Some(merge) = self.mutate(|state| state.merge_page(token, response.tickets)) else {
                tracing::debug!(token, page, "discarding page from superseded load");
                return Ok(LoadOutcome::Superseded);
            };
            tickets += merge.merged;
            tracing::debug!(
                token,
                page,
                total_pages,
                merged = merge.merged,
                skipped = merge.skipped,
                "merged ticket page"
            );

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::info!(token, group_title = %group_title, pages = page, tickets, "ticket load complete");
        Ok(LoadOutcome::Completed {
            pages: page,
            tickets,
        })
    }

    /// Server-side filter for a scope: allowed workflows minus terminal ones,
    /// and the owner restriction for non-privileged callers.
    fn search_attributes(&self, scope: &Scope) -> FilterSet {
        let filter =
            FilterSet::new().workflows(scope.requested_workflows(&self.config.excluded_workflows));
        if scope.privileged {
            filter
        } else {
            filter.technicians([Some(scope.user_id)])
        }
    }
}
