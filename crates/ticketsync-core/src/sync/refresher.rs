use super::SyncEngine;
use crate::api::TicketApi;
use crate::error::SyncError;
use crate::events::SyncNotification;
use crate::models::TicketId;
use crate::push::PushChannel;

/// What a refresh did with the fetched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// In the active scope: replaced (or added) in the main view.
    Updated { delta: i64, inserted: bool },
    /// Outside the active scope, in a group the caller still has access to.
    /// Evicted if it was resident and forwarded as refreshed.
    Forwarded,
    /// Not visible: the caller has no access to the ticket's group. Evicted
    /// if it was resident; returned even when nothing was held.
    Removed,
}

impl<A: TicketApi, C: PushChannel> SyncEngine<A, C> {
    /// Fetch one ticket and reconcile it into both views.
    ///
    /// Safe to run concurrently for different ids. For the same id the last
    /// response to arrive wins. On fetch failure nothing changes; the ticket
    /// stays stale until something triggers another refresh.
    pub async fn refresh(&self, id: TicketId) -> Result<RefreshOutcome, SyncError> {
        let ticket = match self.api.get_ticket(id).await {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::warn!(ticket_id = id, error = %e, "ticket refresh failed");
                self.report_failure(format!("refresh ticket {}", id), &e);
                return Err(e);
            }
        };

        let visible = self.access.read().sees_group(&ticket.group_title);
        let outcome = self.mutate(|state| {
            if state.scope_admits(&ticket) {
                let reconciled = state.reconcile(ticket.clone());
                return RefreshOutcome::Updated {
                    delta: reconciled.delta,
                    inserted: reconciled.inserted,
                };
            }
            // Main holds exactly the scoped set, so anything left behind goes
            state.evict(id);
            if visible {
                RefreshOutcome::Forwarded
            } else {
                RefreshOutcome::Removed
            }
        });
        tracing::debug!(ticket_id = id, ?outcome, "ticket refreshed");

        match outcome {
            RefreshOutcome::Updated { inserted, .. } => {
                if inserted {
                    self.join_room(id);
                }
                self.notify(SyncNotification::TicketRefreshed(ticket));
            }
            RefreshOutcome::Forwarded => self.notify(SyncNotification::TicketRefreshed(ticket)),
            RefreshOutcome::Removed => {}
        }
        Ok(outcome)
    }
}
