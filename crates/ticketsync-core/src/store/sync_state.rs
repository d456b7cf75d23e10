use crate::filter::{FilterSet, MatchContext};
use crate::models::{Scope, Ticket, TicketId, TicketPreview};

use super::TicketStore;

/// Result of merging one bulk-load page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMerge {
    pub merged: usize,
    pub skipped: usize,
}

/// Result of reconciling an authoritative record into the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// Change to the aggregate unseen counter.
    pub delta: i64,
    /// The record was not in the main store before.
    pub inserted: bool,
    /// Chat store membership after reconciling.
    pub in_chat: bool,
}

/// Both ticket views plus the scope and chat filter that define them.
///
/// The main store holds exactly the tickets the active scope admits; the chat
/// store holds the subset of those that also satisfy the chat filter. Every
/// mutation goes through here so the two never disagree about a ticket they
/// both hold.
#[derive(Debug)]
pub struct SyncState {
    main: TicketStore,
    chat: TicketStore,
    chat_filter: FilterSet,
    scope: Option<Scope>,
    load_token: u64,
    ctx: MatchContext,
}

impl SyncState {
    pub fn new(ctx: MatchContext) -> Self {
        Self {
            main: TicketStore::new(),
            chat: TicketStore::new(),
            chat_filter: FilterSet::default(),
            scope: None,
            load_token: 0,
            ctx,
        }
    }

    // ===== Getters =====

    pub fn main(&self) -> &TicketStore {
        &self.main
    }

    pub fn chat(&self) -> &TicketStore {
        &self.chat
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn chat_filter(&self) -> &FilterSet {
        &self.chat_filter
    }

    pub fn match_context(&self) -> MatchContext {
        self.ctx
    }

    /// Aggregate unseen counter: the main store's running sum.
    pub fn unseen_total(&self) -> u64 {
        self.main.unseen_total()
    }

    pub fn holds(&self, id: TicketId) -> bool {
        self.main.contains(id) || self.chat.contains(id)
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.load_token == token
    }

    pub fn scope_admits(&self, ticket: &Ticket) -> bool {
        self.scope.as_ref().is_some_and(|scope| scope.admits(ticket))
    }

    // ===== Mutations =====

    pub fn set_match_context(&mut self, ctx: MatchContext) {
        self.ctx = ctx;
    }

    /// Start a new bulk load: switch scope, empty both views, and issue a token
    /// that invalidates any load still in flight.
    pub fn begin_load(&mut self, scope: Scope) -> u64 {
        self.load_token += 1;
        self.scope = Some(scope);
        self.main.clear();
        self.chat.clear();
        self.load_token
    }

    /// Merge one page of a bulk load. Returns `None` if the token is stale.
    pub fn merge_page(&mut self, token: u64, tickets: Vec<Ticket>) -> Option<PageMerge> {
        if !self.is_current(token) {
            return None;
        }
        let mut merge = PageMerge {
            merged: 0,
            skipped: 0,
        };
        for ticket in tickets {
            if self.main.contains(ticket.id) || !self.scope_admits(&ticket) {
                merge.skipped += 1;
                continue;
            }
            if self.chat_filter.matches(&ticket, &self.ctx) {
                self.chat.replace(ticket.clone());
            }
            self.main.replace(ticket);
            merge.merged += 1;
        }
        Some(merge)
    }

    /// Authoritative upsert of an in-scope record into both views.
    pub fn reconcile(&mut self, ticket: Ticket) -> Reconciled {
        let inserted = !self.main.contains(ticket.id);
        let wants_chat = self.chat_filter.matches(&ticket, &self.ctx);
        let id = ticket.id;

        if wants_chat {
            self.chat.replace(ticket.clone());
        } else {
            self.chat.remove(id);
        }
        let delta = self.main.replace(ticket);

        Reconciled {
            delta,
            inserted,
            in_chat: wants_chat,
        }
    }

    /// Remove a ticket from both views. Idempotent.
    pub fn evict(&mut self, id: TicketId) -> Option<Ticket> {
        let from_chat = self.chat.remove(id);
        self.main.remove(id).or(from_chat)
    }

    /// Non-authoritative preview update on whichever views hold the ticket.
    pub fn apply_preview(&mut self, id: TicketId, preview: &TicketPreview) -> bool {
        let in_main = self.main.patch(id, preview);
        let in_chat = self.chat.patch(id, preview);
        in_main || in_chat
    }

    /// Replace the chat filter and rebuild the chat view from the main store.
    pub fn set_chat_filter(&mut self, filter: FilterSet) {
        self.chat_filter = filter;
        self.chat.clear();
        for ticket in self.main.all() {
            if self.chat_filter.matches(ticket, &self.ctx) {
                self.chat.replace(ticket.clone());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.main.assert_consistent();
        self.chat.assert_consistent();
        for ticket in self.main.all() {
            assert!(self.scope_admits(ticket), "out-of-scope ticket {} in main", ticket.id);
        }
        for ticket in self.chat.all() {
            assert_eq!(self.main.get(ticket.id), Some(ticket), "chat diverged for {}", ticket.id);
            assert!(self.chat_filter.matches(ticket, &self.ctx));
        }
    }
}
