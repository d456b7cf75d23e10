pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod filter;
pub mod models;
pub mod push;
pub mod store;
pub mod sync;
pub mod tracing_setup;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the engine surface at crate root for convenience
pub use api::TicketApi;
pub use config::SyncConfig;
pub use error::SyncError;
pub use events::{NotificationSink, SyncNotification};
pub use filter::{FilterSet, MatchContext};
pub use models::{AccessPolicy, PushMessage, Scope, Ticket, TicketId};
pub use push::{PushChannel, PushEvent};
pub use sync::{LoadOutcome, RefreshOutcome, SyncEngine, SyncSnapshot};
