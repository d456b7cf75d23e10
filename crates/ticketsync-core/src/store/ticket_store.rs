use crate::models::{Ticket, TicketId, TicketPreview};
use std::collections::HashMap;

/// Ordered ticket list with an id index and a running unseen sum.
///
/// `index[id]` is always the position of that ticket in `tickets`, and
/// `unseen_total` is always the sum of `unseen_count` over `tickets`. Both are
/// maintained only from the deltas each mutation produces.
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: Vec<Ticket>,
    index: HashMap<TicketId, usize>,
    unseen_total: u64,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tickets.clear();
        self.index.clear();
        self.unseen_total = 0;
    }

    // ===== Getters =====

    pub fn get(&self, id: TicketId) -> Option<&Ticket> {
        self.index.get(&id).map(|&pos| &self.tickets[pos])
    }

    pub fn all(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn contains(&self, id: TicketId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn ids(&self) -> Vec<TicketId> {
        self.tickets.iter().map(|t| t.id).collect()
    }

    pub fn unseen_total(&self) -> u64 {
        self.unseen_total
    }

    // ===== Mutations =====

    /// Authoritative write: replace the record wholesale, or append it if new.
    /// Returns the unseen delta `new - old` (old is 0 for a new record).
    pub fn replace(&mut self, ticket: Ticket) -> i64 {
        let new_unseen = i64::from(ticket.unseen_count);
        let old_unseen = match self.index.get(&ticket.id) {
            Some(&pos) => {
                let old = std::mem::replace(&mut self.tickets[pos], ticket);
                i64::from(old.unseen_count)
            }
            None => {
                self.index.insert(ticket.id, self.tickets.len());
                self.tickets.push(ticket);
                0
            }
        };
        let delta = new_unseen - old_unseen;
        self.apply_delta(delta);
        delta
    }

    /// Non-authoritative write: merge preview fields into an existing record.
    /// Returns false if the id is not held. Never touches counters.
    pub fn patch(&mut self, id: TicketId, preview: &TicketPreview) -> bool {
        match self.index.get(&id) {
            Some(&pos) => {
                self.tickets[pos].apply_preview(preview);
                true
            }
            None => false,
        }
    }

    /// Idempotent removal. Returns the removed record so callers can log its prior
    /// unseen count; the store's own sum is already adjusted.
    pub fn remove(&mut self, id: TicketId) -> Option<Ticket> {
        let pos = self.index.remove(&id)?;
        let removed = self.tickets.remove(pos);
        for ticket in &self.tickets[pos..] {
            if let Some(slot) = self.index.get_mut(&ticket.id) {
                *slot -= 1;
            }
        }
        self.apply_delta(-i64::from(removed.unseen_count));
        Some(removed)
    }

    fn apply_delta(&mut self, delta: i64) {
        self.unseen_total = self.unseen_total.saturating_add_signed(delta);
    }

    /// Checks the index and sum against the list. Test and debug aid.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.index.len(), self.tickets.len(), "index size mismatch");
        for (pos, ticket) in self.tickets.iter().enumerate() {
            assert_eq!(self.index.get(&ticket.id), Some(&pos), "stale index for {}", ticket.id);
        }
        let sum: u64 = self.tickets.iter().map(|t| u64::from(t.unseen_count)).sum();
        assert_eq!(self.unseen_total, sum, "unseen sum drifted");
    }
}
