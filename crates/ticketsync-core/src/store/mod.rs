pub mod dedup;
pub mod sync_state;
pub mod ticket_store;

pub use dedup::DedupGuard;
pub use sync_state::{PageMerge, Reconciled, SyncState};
pub use ticket_store::TicketStore;
