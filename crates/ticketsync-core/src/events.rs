use crate::models::{DeliveredMessage, Ticket, TicketId};
use tokio::sync::mpsc;

/// Notifications the engine emits for the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncNotification {
    /// A new inbound message the user should hear about.
    NewMessage(DeliveredMessage),
    /// Someone acknowledged the messages on a ticket.
    MessageSeen { ticket_id: TicketId, client_id: i64 },
    MessageDeleted { message_id: String },
    /// A full record was fetched, whether or not it landed in a store.
    TicketRefreshed(Ticket),
    /// The aggregate unseen counter changed.
    UnseenChanged { total: u64 },
    /// Generic failure report (page or single-ticket fetch).
    SyncFailed { context: String, message: String },
}

/// Receiver of engine notifications. Invoked synchronously from engine calls,
/// so implementations should hand off rather than block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: SyncNotification);
}

impl NotificationSink for mpsc::UnboundedSender<SyncNotification> {
    fn notify(&self, notification: SyncNotification) {
        // Receiver gone means nobody is listening anymore
        let _ = self.send(notification);
    }
}
