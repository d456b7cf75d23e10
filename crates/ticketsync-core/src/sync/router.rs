use futures::future::join_all;

use super::SyncEngine;
use crate::api::TicketApi;
use crate::events::SyncNotification;
use crate::models::{
    DeliveredMessage, PushMessage, Scope, TicketBatchUpdate, TicketId, TicketSummary,
    TicketTouched,
};
use crate::push::PushChannel;

/// Batch records may leave the group out; an empty one does not constrain.
fn summary_in_scope(scope: &Scope, summary: &TicketSummary) -> bool {
    let group_title = if summary.group_title.is_empty() {
        scope.group_title.as_str()
    } else {
        summary.group_title.as_str()
    };
    scope.admits_fields(group_title, &summary.workflow, summary.technician_id)
}

impl<A: TicketApi, C: PushChannel> SyncEngine<A, C> {
    /// Dispatch one decoded push message.
    pub async fn handle_push(&self, message: PushMessage) {
        tracing::trace!(tag = message.tag(), "push message");
        match message {
            PushMessage::Message(delivered) => self.on_message(delivered),
            PushMessage::Seen(receipt) => self.notify(SyncNotification::MessageSeen {
                ticket_id: receipt.ticket_id,
                client_id: receipt.client_id,
            }),
            PushMessage::Deleted(deleted) => self.notify(SyncNotification::MessageDeleted {
                message_id: deleted.message_id,
            }),
            PushMessage::Touched(touched) => self.on_touched(touched).await,
            PushMessage::BatchUpdated(update) => self.on_batch_update(update).await,
            PushMessage::Unknown(_) => {}
        }
    }

    fn on_message(&self, delivered: DeliveredMessage) {
        let preview = delivered.preview();
        let patched = self.mutate(|state| state.apply_preview(delivered.ticket_id, &preview));

        // Preview updates are idempotent; only the forward is deduplicated
        let first_delivery = match &delivered.message_id {
            Some(id) => self.dedup.lock().record(id),
            None => true,
        };

        let ctx = self.state.lock().match_context();
        let external =
            delivered.sender_id != ctx.user_id && delivered.sender_id != ctx.system_sender_id;
        tracing::trace!(
            ticket_id = delivered.ticket_id,
            patched,
            first_delivery,
            external,
            "message delivered"
        );

        if delivered.is_call() || (external && first_delivery) {
            self.notify(SyncNotification::NewMessage(delivered));
        }
    }

    async fn on_touched(&self, touched: TicketTouched) {
        let declared = self.state.lock().scope().is_some_and(|scope| {
            scope.declares(touched.group_title.as_deref(), touched.workflow.as_deref())
        });
        if !declared {
            tracing::trace!(
                ticket_ids = ?touched.ticket_ids,
                group_title = ?touched.group_title,
                "touched tickets outside active scope"
            );
            return;
        }
        self.refresh_all(touched.ticket_ids).await;
    }

    async fn on_batch_update(&self, update: TicketBatchUpdate) {
        let to_refresh = match update {
            TicketBatchUpdate::Records(records) => {
                let Some(scope) = self.scope() else {
                    return;
                };
                let (keep, gone): (Vec<_>, Vec<_>) = records
                    .into_iter()
                    .partition(|summary| summary_in_scope(&scope, summary));
                if !gone.is_empty() {
                    self.mutate(|state| {
                        for summary in &gone {
                            state.evict(summary.id);
                        }
                    });
                    tracing::debug!(count = gone.len(), "dropped tickets that left the scope");
                }
                keep.into_iter().map(|summary| summary.id).collect()
            }
            TicketBatchUpdate::Legacy(ids) => self.resident(ids),
        };
        self.refresh_all(to_refresh).await;
    }

    fn resident(&self, mut ids: Vec<TicketId>) -> Vec<TicketId> {
        let state = self.state.lock();
        ids.retain(|id| state.holds(*id));
        ids
    }

    /// Refresh several tickets concurrently. Failures are already reported
    /// by `refresh` itself.
    async fn refresh_all(&self, ids: Vec<TicketId>) {
        if ids.is_empty() {
            return;
        }
        let refreshes: Vec<_> = ids.into_iter().map(|id| self.refresh(id)).collect();
        join_all(refreshes).await;
    }
}
