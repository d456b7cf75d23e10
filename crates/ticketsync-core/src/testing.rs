//! In-memory collaborators for engine tests.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::api::{Pagination, SearchRequest, TicketApi, TicketPage};
use crate::error::SyncError;
use crate::events::{NotificationSink, SyncNotification};
use crate::models::{OutboundFrame, Ticket, TicketId};
use crate::push::PushChannel;

pub fn ticket(id: TicketId, group_title: &str, workflow: &str, unseen: u32) -> Ticket {
    let mut t = Ticket::new(id, group_title, workflow);
    t.unseen_count = unseen;
    t
}

pub fn page(tickets: Vec<Ticket>, total_pages: u32) -> TicketPage {
    TicketPage {
        tickets,
        pagination: Pagination { total_pages },
    }
}

fn server_error() -> SyncError {
    SyncError::Http {
        status: 500,
        body: "boom".to_string(),
    }
}

#[derive(Default)]
struct MockApiInner {
    pages: HashMap<(String, u32), TicketPage>,
    failing_pages: Vec<(String, u32)>,
    gates: HashMap<(String, u32), oneshot::Receiver<()>>,
    tickets: HashMap<TicketId, Ticket>,
    failing_tickets: Vec<TicketId>,
    searches: Vec<SearchRequest>,
    fetches: Vec<TicketId>,
}

/// Scripted ticket backend. Clones share state.
#[derive(Clone, Default)]
pub struct MockTicketApi {
    inner: Arc<Mutex<MockApiInner>>,
}

impl MockTicketApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, group_title: &str, number: u32, response: TicketPage) {
        self.inner
            .lock()
            .pages
            .insert((group_title.to_string(), number), response);
    }

    pub fn fail_page(&self, group_title: &str, number: u32) {
        self.inner
            .lock()
            .failing_pages
            .push((group_title.to_string(), number));
    }

    /// Hold the response for a page until the returned sender fires.
    pub fn gate_page(&self, group_title: &str, number: u32) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .lock()
            .gates
            .insert((group_title.to_string(), number), rx);
        tx
    }

    pub fn set_ticket(&self, ticket: Ticket) {
        self.inner.lock().tickets.insert(ticket.id, ticket);
    }

    pub fn fail_ticket(&self, id: TicketId) {
        self.inner.lock().failing_tickets.push(id);
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        self.inner.lock().searches.clone()
    }

    pub fn fetches(&self) -> Vec<TicketId> {
        self.inner.lock().fetches.clone()
    }

    pub fn call_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.searches.len() + inner.fetches.len()
    }
}

impl TicketApi for MockTicketApi {
    async fn search_tickets(&self, request: SearchRequest) -> Result<TicketPage, SyncError> {
        let key = (request.group_title.clone(), request.page);
        let gate = {
            let mut inner = self.inner.lock();
            inner.searches.push(request);
            inner.gates.remove(&key)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let inner = self.inner.lock();
        if inner.failing_pages.contains(&key) {
            return Err(server_error());
        }
        Ok(inner.pages.get(&key).cloned().unwrap_or_default())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, SyncError> {
        let mut inner = self.inner.lock();
        inner.fetches.push(id);
        if inner.failing_tickets.contains(&id) {
            return Err(server_error());
        }
        inner.tickets.get(&id).cloned().ok_or_else(|| SyncError::Http {
            status: 404,
            body: format!("ticket {} not found", id),
        })
    }
}

/// Push channel that records frames instead of sending them.
#[derive(Clone, Default)]
pub struct MockChannel {
    open: Arc<AtomicBool>,
    frames: Arc<Mutex<Vec<OutboundFrame>>>,
}

impl MockChannel {
    pub fn open() -> Self {
        let channel = Self::default();
        channel.set_open(true);
        channel
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<OutboundFrame> {
        self.frames.lock().clone()
    }

    /// Ids carried by every recorded connect frame, one vec per frame.
    pub fn batches(&self) -> Vec<Vec<TicketId>> {
        self.frames
            .lock()
            .iter()
            .map(|frame| match frame {
                OutboundFrame::Connect { ticket_id } => ticket_id.clone(),
            })
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl PushChannel for MockChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, frame: &OutboundFrame) -> Result<(), SyncError> {
        if !self.is_open() {
            return Err(SyncError::ChannelClosed);
        }
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}

/// Sink that keeps every notification.
#[derive(Clone, Default)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<SyncNotification>>>,
}

impl RecordingSink {
    pub fn all(&self) -> Vec<SyncNotification> {
        self.received.lock().clone()
    }

    pub fn new_messages(&self) -> usize {
        self.received
            .lock()
            .iter()
            .filter(|n| matches!(n, SyncNotification::NewMessage(_)))
            .count()
    }

    pub fn refreshed(&self) -> Vec<TicketId> {
        self.received
            .lock()
            .iter()
            .filter_map(|n| match n {
                SyncNotification::TicketRefreshed(ticket) => Some(ticket.id),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.received
            .lock()
            .iter()
            .filter(|n| matches!(n, SyncNotification::SyncFailed { .. }))
            .count()
    }

    pub fn last_unseen(&self) -> Option<u64> {
        self.received.lock().iter().rev().find_map(|n| match n {
            SyncNotification::UnseenChanged { total } => Some(*total),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.received.lock().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: SyncNotification) {
        self.received.lock().push(notification);
    }
}
