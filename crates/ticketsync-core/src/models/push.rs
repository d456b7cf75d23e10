use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{wire, TicketId, TicketPreview};
use crate::constants::CALL_MESSAGE_TYPES;

/// A chat message delivered on a ticket (`type: "message"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredMessage {
    #[serde(deserialize_with = "wire::id")]
    pub ticket_id: TicketId,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub time_sent: Option<String>,
    #[serde(default)]
    pub mtype: String,
    #[serde(deserialize_with = "wire::id")]
    pub sender_id: i64,
    /// Delivery id used to suppress duplicate forwards.
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub message_id: Option<String>,
}

impl DeliveredMessage {
    pub fn preview(&self) -> TicketPreview {
        TicketPreview {
            last_message: Some(self.message.clone()),
            last_message_type: Some(self.mtype.clone()),
            time_sent: self.time_sent.clone(),
        }
    }

    pub fn is_call(&self) -> bool {
        CALL_MESSAGE_TYPES.contains(&self.mtype.as_str())
    }
}

/// Read receipt (`type: "seen"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeenReceipt {
    #[serde(deserialize_with = "wire::id")]
    pub ticket_id: TicketId,
    #[serde(deserialize_with = "wire::id")]
    pub client_id: i64,
}

/// Message removal (`type: "delete"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedMessage {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub message_id: String,
}

/// One or more tickets changed server-side (`type: "ticket"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketTouched {
    pub ticket_ids: Vec<TicketId>,
    pub group_title: Option<String>,
    pub workflow: Option<String>,
}

/// Partial record carried by a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketSummary {
    #[serde(deserialize_with = "wire::id")]
    pub id: TicketId,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub technician_id: Option<i64>,
    #[serde(default)]
    pub workflow: String,
    #[serde(default)]
    pub group_title: String,
}

/// `type: "ticket_update"`: either partial records or the older bare id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketBatchUpdate {
    Records(Vec<TicketSummary>),
    Legacy(Vec<TicketId>),
}

/// Inbound push message, decoded once from the `{ type, data }` envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Message(DeliveredMessage),
    Seen(SeenReceipt),
    Deleted(DeletedMessage),
    Touched(TicketTouched),
    BatchUpdated(TicketBatchUpdate),
    /// A tag this client does not understand. Kept so callers can log it.
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct RawIds {
    #[serde(default, deserialize_with = "wire::id_list")]
    ticket_id: Vec<TicketId>,
    #[serde(default, deserialize_with = "wire::id_list")]
    ticket_ids: Vec<TicketId>,
}

impl RawIds {
    fn into_ids(self) -> Vec<TicketId> {
        let mut ids = self.ticket_id;
        for id in self.ticket_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[derive(Deserialize)]
struct RawTouched {
    #[serde(flatten)]
    ids: RawIds,
    #[serde(default)]
    group_title: Option<String>,
    #[serde(default)]
    workflow: Option<String>,
}

impl PushMessage {
    /// Decode a text frame. Returns `None` for anything malformed; callers drop those.
    pub fn decode(text: &str) -> Option<Self> {
        let envelope: Envelope = serde_json::from_str(text).ok()?;
        Self::from_envelope(&envelope.kind, envelope.data)
    }

    pub fn from_envelope(kind: &str, data: Value) -> Option<Self> {
        match kind {
            "message" => serde_json::from_value(data).ok().map(Self::Message),
            "seen" => serde_json::from_value(data).ok().map(Self::Seen),
            "delete" => serde_json::from_value(data).ok().map(Self::Deleted),
            "ticket" => {
                let raw: RawTouched = serde_json::from_value(data).ok()?;
                Some(Self::Touched(TicketTouched {
                    ticket_ids: raw.ids.into_ids(),
                    group_title: raw.group_title,
                    workflow: raw.workflow,
                }))
            }
            "ticket_update" => {
                if let Some(records) = data.get("tickets").filter(|t| t.is_array()) {
                    let records: Vec<TicketSummary> =
                        serde_json::from_value(records.clone()).ok()?;
                    Some(Self::BatchUpdated(TicketBatchUpdate::Records(records)))
                } else {
                    let raw: RawIds = serde_json::from_value(data).ok()?;
                    Some(Self::BatchUpdated(TicketBatchUpdate::Legacy(raw.into_ids())))
                }
            }
            other => Some(Self::Unknown(other.to_string())),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Seen(_) => "seen",
            Self::Deleted(_) => "delete",
            Self::Touched(_) => "ticket",
            Self::BatchUpdated(_) => "ticket_update",
            Self::Unknown(tag) => tag,
        }
    }
}

/// Frames this client sends over the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Join the rooms of the listed tickets.
    Connect { ticket_id: Vec<TicketId> },
}

impl OutboundFrame {
    pub fn connect(ids: &[TicketId]) -> Self {
        Self::Connect {
            ticket_id: ids.to_vec(),
        }
    }
}
