//! Ticket filter predicate.
//!
//! A [`FilterSet`] is the attribute map the UI builds from its filter panel. It is
//! sent to the search endpoint verbatim and also evaluated locally to decide
//! which tickets belong in the chat list. Semantics:
//! - an absent field, or an empty list, does not constrain
//! - list fields match when the ticket value is one of the listed values
//! - `unseen: "true"` requires at least one unseen message
//! - `last_message_author: [0]` selects tickets whose last message came from an
//!   external participant
//! - fields this module does not know are kept for the server and ignored here

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::EXTERNAL_AUTHOR_MARKER;
use crate::models::wire;
use crate::models::Ticket;

/// Who is asking. Needed to tell external authors from the caller and the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchContext {
    pub user_id: i64,
    pub system_sender_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_value_list"
    )]
    pub workflow: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_loose_bool"
    )]
    pub action_needed: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_value_list"
    )]
    pub technician_id: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_value_list"
    )]
    pub priority: Option<Vec<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_value_list"
    )]
    pub group_title: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unseen: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "wire::opt_id_list"
    )]
    pub last_message_author: Option<Vec<i64>>,
    /// Attributes only the server understands.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workflows<I, S>(mut self, workflows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workflow = Some(workflows.into_iter().map(Into::into).collect());
        self
    }

    pub fn technicians<I: IntoIterator<Item = Option<i64>>>(mut self, ids: I) -> Self {
        self.technician_id = Some(ids.into_iter().map(stringify_owner).collect());
        self
    }

    pub fn unseen_only(mut self) -> Self {
        self.unseen = Some("true".to_string());
        self
    }

    pub fn external_author(mut self) -> Self {
        self.last_message_author = Some(vec![EXTERNAL_AUTHOR_MARKER]);
        self
    }

    /// True when no field constrains matching.
    pub fn is_unconstrained(&self) -> bool {
        fn open<T>(values: &Option<Vec<T>>) -> bool {
            values.as_ref().map_or(true, Vec::is_empty)
        }
        open(&self.workflow)
            && self.action_needed.is_none()
            && open(&self.technician_id)
            && open(&self.priority)
            && open(&self.group_title)
            && self.unseen.as_deref() != Some("true")
            && open(&self.last_message_author)
    }

    pub fn matches(&self, ticket: &Ticket, ctx: &MatchContext) -> bool {
        accepts(&self.workflow, Some(&ticket.workflow))
            && self
                .action_needed
                .map_or(true, |wanted| ticket.action_needed == wanted)
            && accepts(
                &self.technician_id,
                Some(&stringify_owner(ticket.technician_id)),
            )
            && accepts(&self.priority, ticket.priority.as_deref())
            && accepts(&self.group_title, Some(&ticket.group_title))
            && (self.unseen.as_deref() != Some("true") || ticket.unseen_count > 0)
            && self
                .last_message_author
                .as_deref()
                .map_or(true, |authors| last_author_matches(authors, ticket, ctx))
    }
}

/// Free-function form of [`FilterSet::matches`].
pub fn matches(ticket: &Ticket, filter: &FilterSet, ctx: &MatchContext) -> bool {
    filter.matches(ticket, ctx)
}

fn accepts(allowed: &Option<Vec<String>>, value: Option<&str>) -> bool {
    match allowed {
        Some(list) if !list.is_empty() => value.is_some_and(|v| list.iter().any(|a| a == v)),
        _ => true,
    }
}

fn stringify_owner(id: Option<i64>) -> String {
    id.map_or_else(|| "null".to_string(), |id| id.to_string())
}

fn last_author_matches(authors: &[i64], ticket: &Ticket, ctx: &MatchContext) -> bool {
    if authors.is_empty() {
        return true;
    }
    if authors.contains(&EXTERNAL_AUTHOR_MARKER) && is_external_author(ticket, ctx) {
        return true;
    }
    ticket
        .last_message_sender_id
        .is_some_and(|sender| sender != EXTERNAL_AUTHOR_MARKER && authors.contains(&sender))
}

/// Last message came from someone other than the caller or the system, and that
/// someone is a participant. Without a participant list we cannot tell, and match.
fn is_external_author(ticket: &Ticket, ctx: &MatchContext) -> bool {
    let sender = ticket.last_message_sender_id;
    if sender == Some(ctx.system_sender_id) || sender == Some(ctx.user_id) {
        return false;
    }
    match (&ticket.clients, sender) {
        (None, _) => true,
        (Some(clients), Some(sender)) => clients.contains(&sender),
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CTX: MatchContext = MatchContext {
        user_id: 7,
        system_sender_id: 1,
    };

    fn ticket() -> Ticket {
        let mut t = Ticket::new(10, "Sales", "New");
        t.technician_id = Some(7);
        t.priority = Some("high".to_string());
        t
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = FilterSet::new();
        assert!(filter.is_unconstrained());
        assert!(filter.matches(&ticket(), &CTX));
        assert!(matches(&Ticket::new(1, "", ""), &filter, &CTX));
    }

    #[test]
    fn test_unseen_filter() {
        let filter: FilterSet = serde_json::from_value(json!({ "unseen": "true" })).unwrap();
        let mut t = ticket();
        t.unseen_count = 3;
        assert!(filter.matches(&t, &CTX));
        t.unseen_count = 0;
        assert!(!filter.matches(&t, &CTX));

        let off: FilterSet = serde_json::from_value(json!({ "unseen": "false" })).unwrap();
        assert!(off.matches(&t, &CTX));
    }

    #[test]
    fn test_list_fields() {
        let filter: FilterSet = serde_json::from_value(json!({
            "workflow": ["New", "Open"],
            "technician_id": [7, "8"],
            "priority": "high",
            "group_title": ["Sales"]
        }))
        .unwrap();
        assert!(filter.matches(&ticket(), &CTX));

        let mut other = ticket();
        other.workflow = "Closed".to_string();
        assert!(!filter.matches(&other, &CTX));

        let mut unowned = ticket();
        unowned.technician_id = None;
        assert!(!filter.matches(&unowned, &CTX));
        let wants_unowned = FilterSet::new().technicians([None]);
        assert!(wants_unowned.matches(&unowned, &CTX));

        let mut no_priority = ticket();
        no_priority.priority = None;
        assert!(!filter.matches(&no_priority, &CTX));
    }

    #[test]
    fn test_empty_list_does_not_constrain() {
        let filter: FilterSet = serde_json::from_value(json!({ "workflow": [] })).unwrap();
        assert!(filter.is_unconstrained());
        assert!(filter.matches(&ticket(), &CTX));
    }

    #[test]
    fn test_action_needed() {
        let filter: FilterSet =
            serde_json::from_value(json!({ "action_needed": "true" })).unwrap();
        let mut t = ticket();
        assert!(!filter.matches(&t, &CTX));
        t.action_needed = true;
        assert!(filter.matches(&t, &CTX));
    }

    #[test]
    fn test_external_author() {
        let filter: FilterSet =
            serde_json::from_value(json!({ "last_message_author": [0] })).unwrap();

        let mut from_client = ticket();
        from_client.clients = Some(vec![100, 101]);
        from_client.last_message_sender_id = Some(101);
        assert!(filter.matches(&from_client, &CTX));

        let mut from_me = from_client.clone();
        from_me.last_message_sender_id = Some(CTX.user_id);
        assert!(!filter.matches(&from_me, &CTX));

        let mut from_system = from_client.clone();
        from_system.last_message_sender_id = Some(CTX.system_sender_id);
        assert!(!filter.matches(&from_system, &CTX));

        let mut from_stranger = from_client.clone();
        from_stranger.last_message_sender_id = Some(555);
        assert!(!filter.matches(&from_stranger, &CTX));

        let mut unknown_participants = from_stranger.clone();
        unknown_participants.clients = None;
        assert!(filter.matches(&unknown_participants, &CTX));
    }

    #[test]
    fn test_specific_author() {
        let filter: FilterSet =
            serde_json::from_value(json!({ "last_message_author": [7] })).unwrap();
        let mut t = ticket();
        t.last_message_sender_id = Some(7);
        assert!(filter.matches(&t, &CTX));
        t.last_message_sender_id = Some(8);
        assert!(!filter.matches(&t, &CTX));
    }

    #[test]
    fn test_unknown_fields_kept_but_ignored() {
        let filter: FilterSet =
            serde_json::from_value(json!({ "source": ["web"], "unseen": "true" })).unwrap();
        assert_eq!(filter.other.get("source"), Some(&json!(["web"])));

        let mut t = ticket();
        t.unseen_count = 1;
        assert!(filter.matches(&t, &CTX));

        let wire = serde_json::to_value(&filter).unwrap();
        assert_eq!(wire, json!({ "source": ["web"], "unseen": "true" }));
    }
}
