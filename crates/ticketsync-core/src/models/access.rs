use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Ticket;

/// What the caller may see inside one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAccess {
    #[serde(default)]
    pub workflows: BTreeSet<String>,
    /// Privileged callers see every ticket in an allowed workflow, not only their own.
    #[serde(default)]
    pub privileged: bool,
}

impl GroupAccess {
    pub fn new<I, S>(workflows: I, privileged: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            workflows: workflows.into_iter().map(Into::into).collect(),
            privileged,
        }
    }
}

/// Caller identity plus per-group entitlements.
///
/// Computed by the permission layer and handed to the engine as plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub user_id: i64,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupAccess>,
}

impl AccessPolicy {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            groups: BTreeMap::new(),
        }
    }

    pub fn with_group(mut self, group_title: impl Into<String>, access: GroupAccess) -> Self {
        self.groups.insert(group_title.into(), access);
        self
    }

    pub fn scope_for(&self, group_title: &str) -> Option<Scope> {
        let access = self.groups.get(group_title)?;
        Some(Scope {
            group_title: group_title.to_string(),
            workflows: access.workflows.clone(),
            privileged: access.privileged,
            user_id: self.user_id,
        })
    }

    /// Whether the caller has any access to the group. Workflow and owner
    /// only decide membership of a scope, not visibility.
    pub fn sees_group(&self, group_title: &str) -> bool {
        self.groups.contains_key(group_title)
    }
}

/// The active visibility window: one group, its allowed workflows, and the
/// owner restriction for non-privileged callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub group_title: String,
    pub workflows: BTreeSet<String>,
    pub privileged: bool,
    pub user_id: i64,
}

impl Scope {
    pub fn admits(&self, ticket: &Ticket) -> bool {
        self.admits_fields(&ticket.group_title, &ticket.workflow, ticket.technician_id)
    }

    pub fn admits_fields(
        &self,
        group_title: &str,
        workflow: &str,
        technician_id: Option<i64>,
    ) -> bool {
        group_title == self.group_title
            && self.workflows.contains(workflow)
            && (self.privileged || technician_id == Some(self.user_id))
    }

    /// Scope test for push payloads that only declare group and workflow.
    /// A field the payload leaves out does not constrain.
    pub fn declares(&self, group_title: Option<&str>, workflow: Option<&str>) -> bool {
        group_title.map_or(true, |g| g == self.group_title)
            && workflow.map_or(true, |w| self.workflows.contains(w))
    }

    /// Workflows to request from the server, minus terminal ones.
    pub fn requested_workflows(&self, excluded: &[String]) -> Vec<String> {
        self.workflows
            .iter()
            .filter(|w| !excluded.contains(w))
            .cloned()
            .collect()
    }
}
