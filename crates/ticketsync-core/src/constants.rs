/// Search results are requested in the compact ticket representation.
pub const SEARCH_RESULT_TYPE: &str = "light";

/// Message types that represent call media. These are forwarded regardless of sender.
pub const CALL_MESSAGE_TYPES: &[&str] = &["call"];

/// `last_message_author` filter value selecting tickets whose last message came
/// from an external participant.
pub const EXTERNAL_AUTHOR_MARKER: i64 = 0;

pub const DEFAULT_SYSTEM_SENDER_ID: i64 = 1;
pub const DEFAULT_DEDUP_CAPACITY: usize = 1000;
pub const DEFAULT_ROOM_BATCH_SIZE: usize = 50;
pub const DEFAULT_CHANNEL_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_CHANNEL_POLL_ATTEMPTS: u32 = 120;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;
pub const DEFAULT_SEARCH_PATH: &str = "/api/tickets/filter";
pub const DEFAULT_TICKET_PATH: &str = "/api/tickets";
pub const DEFAULT_SORT_BY: &str = "last_interaction_date";
pub const DEFAULT_ORDER: &str = "desc";

/// Terminal workflows never requested by the bulk loader.
pub const DEFAULT_EXCLUDED_WORKFLOWS: &[&str] = &["Closed", "Lost"];
