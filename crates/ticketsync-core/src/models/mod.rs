pub mod access;
pub mod push;
pub mod ticket;
pub(crate) mod wire;

pub use access::{AccessPolicy, GroupAccess, Scope};
pub use push::{
    DeletedMessage, DeliveredMessage, OutboundFrame, PushMessage, SeenReceipt, TicketBatchUpdate,
    TicketSummary, TicketTouched,
};
pub use ticket::{Ticket, TicketId, TicketPreview};
