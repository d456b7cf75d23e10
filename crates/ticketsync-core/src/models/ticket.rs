use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::wire;

pub type TicketId = i64;

/// A ticket as returned by the search and single-ticket endpoints.
///
/// Every field here is authoritative only when it comes from a full fetch.
/// Push payloads may update the preview fields through [`TicketPreview`], never
/// the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(deserialize_with = "wire::id")]
    pub id: TicketId,
    #[serde(default)]
    pub workflow: String,
    #[serde(default)]
    pub group_title: String,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub technician_id: Option<i64>,
    #[serde(default, deserialize_with = "wire::non_negative")]
    pub unseen_count: u32,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_type: Option<String>,
    #[serde(default)]
    pub time_sent: Option<String>,
    #[serde(default, deserialize_with = "wire::loose_bool")]
    pub action_needed: bool,
    /// Participant ids. `None` when the server did not send the list at all.
    #[serde(default, deserialize_with = "wire::participant_ids")]
    pub clients: Option<Vec<i64>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(
        default,
        alias = "last_message_author",
        deserialize_with = "wire::opt_id"
    )]
    pub last_message_sender_id: Option<i64>,
    /// Display-only fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Ticket {
    pub fn new(id: TicketId, group_title: impl Into<String>, workflow: impl Into<String>) -> Self {
        Self {
            id,
            workflow: workflow.into(),
            group_title: group_title.into(),
            technician_id: None,
            unseen_count: 0,
            last_message: None,
            last_message_type: None,
            time_sent: None,
            action_needed: false,
            clients: None,
            priority: None,
            last_message_sender_id: None,
            extra: Map::new(),
        }
    }

    /// Merge non-authoritative preview fields. Returns true if anything changed.
    pub fn apply_preview(&mut self, preview: &TicketPreview) -> bool {
        let mut changed = false;
        if let Some(message) = &preview.last_message {
            changed |= self.last_message.as_ref() != Some(message);
            self.last_message = Some(message.clone());
        }
        if let Some(kind) = &preview.last_message_type {
            changed |= self.last_message_type.as_ref() != Some(kind);
            self.last_message_type = Some(kind.clone());
        }
        if let Some(time_sent) = &preview.time_sent {
            changed |= self.time_sent.as_ref() != Some(time_sent);
            self.time_sent = Some(time_sent.clone());
        }
        changed
    }
}

/// The subset of ticket fields a push message is allowed to touch.
///
/// No counter or ownership fields: those only change through a full fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPreview {
    pub last_message: Option<String>,
    pub last_message_type: Option<String>,
    pub time_sent: Option<String>,
}
