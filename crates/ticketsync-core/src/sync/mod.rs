//! The synchronization engine.
//!
//! One `SyncEngine` owns both ticket views, the unseen counter, the dedup
//! guard and the room subscription state. Its operations are split across
//! submodules the same way its responsibilities are:
//!
//! - `loader`: paginated bulk load of a scope
//! - `refresher`: authoritative single-ticket reconcile
//! - `router`: push message dispatch
//! - `rooms`: push room membership

mod loader;
mod refresher;
mod rooms;
mod router;

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::TicketApi;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::events::{NotificationSink, SyncNotification};
use crate::filter::FilterSet;
use crate::models::{AccessPolicy, Scope, Ticket, TicketId};
use crate::push::{PushChannel, PushEvent};
use crate::store::{DedupGuard, SyncState};

pub use loader::LoadOutcome;
pub use refresher::RefreshOutcome;

/// Point-in-time copy of the engine's views.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub scope: Option<Scope>,
    pub tickets: Vec<Ticket>,
    pub chat_tickets: Vec<Ticket>,
    pub unseen_total: u64,
}

/// Live ticket synchronization engine.
///
/// Cloning is cheap and every clone drives the same state.
pub struct SyncEngine<A, C> {
    config: Arc<SyncConfig>,
    api: Arc<A>,
    channel: Arc<C>,
    /// Receives every outbound notification. Called outside the state lock.
    sink: Arc<dyn NotificationSink>,
    /// Both views, scope and load token. Never held across an await.
    state: Arc<Mutex<SyncState>>,
    dedup: Arc<Mutex<DedupGuard>>,
    access: Arc<RwLock<AccessPolicy>>,
    /// Bumped by every room subscription request; older pending requests give up.
    room_generation: Arc<AtomicU64>,
}

impl<A, C> Clone for SyncEngine<A, C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            api: self.api.clone(),
            channel: self.channel.clone(),
            sink: self.sink.clone(),
            state: self.state.clone(),
            dedup: self.dedup.clone(),
            access: self.access.clone(),
            room_generation: self.room_generation.clone(),
        }
    }
}

impl<A: TicketApi, C: PushChannel> SyncEngine<A, C> {
    pub fn new(
        config: SyncConfig,
        api: A,
        channel: C,
        sink: impl NotificationSink + 'static,
    ) -> Self {
        let state = SyncState::new(config.match_context());
        let dedup = DedupGuard::new(config.dedup_capacity);
        let access = config.access.clone();
        Self {
            config: Arc::new(config),
            api: Arc::new(api),
            channel: Arc::new(channel),
            sink: Arc::new(sink),
            state: Arc::new(Mutex::new(state)),
            dedup: Arc::new(Mutex::new(dedup)),
            access: Arc::new(RwLock::new(access)),
            room_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    // ===== Getters =====

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn unseen_total(&self) -> u64 {
        self.state.lock().unseen_total()
    }

    /// Main view, in load order.
    pub fn tickets(&self) -> Vec<Ticket> {
        self.state.lock().main().all().to_vec()
    }

    pub fn chat_tickets(&self) -> Vec<Ticket> {
        self.state.lock().chat().all().to_vec()
    }

    pub fn ticket(&self, id: TicketId) -> Option<Ticket> {
        self.state.lock().main().get(id).cloned()
    }

    pub fn scope(&self) -> Option<Scope> {
        self.state.lock().scope().cloned()
    }

    pub fn access_policy(&self) -> AccessPolicy {
        self.access.read().clone()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.state.lock();
        SyncSnapshot {
            scope: state.scope().cloned(),
            tickets: state.main().all().to_vec(),
            chat_tickets: state.chat().all().to_vec(),
            unseen_total: state.unseen_total(),
        }
    }

    // ===== Setters =====

    /// Swap the chat filter. The chat view is rebuilt from the main view.
    pub fn set_chat_filter(&self, filter: FilterSet) {
        self.mutate(|state| state.set_chat_filter(filter));
    }

    /// Replace the caller's entitlements. Takes effect for the next scope
    /// load and for every visibility check from now on. A different caller
    /// starts with an empty delivery history.
    pub fn set_access_policy(&self, policy: AccessPolicy) {
        let user_id = policy.user_id;
        let previous = std::mem::replace(&mut *self.access.write(), policy);
        if previous.user_id != user_id {
            self.dedup.lock().clear();
        }
        self.mutate(|state| {
            let mut ctx = state.match_context();
            ctx.user_id = user_id;
            state.set_match_context(ctx);
        });
    }

    // ===== Operations =====

    /// Switch to a group: resolve its scope, bulk load it, then subscribe to
    /// the rooms of whatever got loaded. The subscription runs in the
    /// background since it may have to wait for the push channel.
    pub async fn set_scope(&self, group_title: &str) -> Result<LoadOutcome, SyncError> {
        let scope = self
            .access
            .read()
            .scope_for(group_title)
            .ok_or_else(|| SyncError::NoAccess(group_title.to_string()))?;

        let loaded = self.load(scope).await;
        if matches!(loaded, Ok(LoadOutcome::Superseded)) {
            return loaded;
        }

        // Partial loads still get their rooms
        let engine = self.clone();
        tokio::spawn(async move {
            engine.subscribe_rooms().await;
        });
        loaded
    }

    /// Apply one event from the push connection.
    pub async fn handle_event(&self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                tracing::info!("push channel up, re-issuing room membership");
                self.subscribe_rooms().await;
            }
            PushEvent::Disconnected => {
                tracing::info!("push channel down");
            }
            PushEvent::Message(message) => self.handle_push(message).await,
        }
    }

    /// Drive the engine from a push event stream until it closes.
    pub async fn run(&self, mut events: mpsc::Receiver<PushEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("push event stream closed");
    }

    // ===== Internals =====

    /// Run a state mutation and report the counter if it moved.
    fn mutate<R>(&self, f: impl FnOnce(&mut SyncState) -> R) -> R {
        let (result, before, after) = {
            let mut state = self.state.lock();
            let before = state.unseen_total();
            let result = f(&mut state);
            (result, before, state.unseen_total())
        };
        if before != after {
            self.notify(SyncNotification::UnseenChanged { total: after });
        }
        result
    }

    fn notify(&self, notification: SyncNotification) {
        self.sink.notify(notification);
    }

    fn report_failure(&self, context: String, error: &SyncError) {
        self.notify(SyncNotification::SyncFailed {
            context,
            message: error.to_string(),
        });
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.state.lock().assert_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupAccess, PushMessage};
    use crate::testing::{page, ticket, MockChannel, MockTicketApi, RecordingSink};

    fn config() -> SyncConfig {
        SyncConfig {
            access: AccessPolicy::new(7)
                .with_group("Sales", GroupAccess::new(["New", "Open"], true))
                .with_group("Support", GroupAccess::new(["Open"], false)),
            channel_poll_interval_ms: 5,
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_set_scope_loads_and_joins_rooms() {
        let api = MockTicketApi::new();
        api.set_page(
            "Sales",
            1,
            page(vec![ticket(1, "Sales", "New", 2), ticket(2, "Sales", "Open", 1)], 1),
        );
        let channel = MockChannel::open();
        let sink = RecordingSink::default();
        let engine = SyncEngine::new(config(), api, channel.clone(), sink.clone());

        let outcome = engine.set_scope("Sales").await.unwrap();
        assert_eq!(outcome, LoadOutcome::Completed { pages: 1, tickets: 2 });
        assert_eq!(engine.unseen_total(), 3);
        assert_eq!(sink.last_unseen(), Some(3));

        for _ in 0..100 {
            if !channel.frames().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(channel.batches(), vec![vec![1, 2]]);
        engine.assert_invariants();
    }

    #[tokio::test]
    async fn test_set_scope_without_access() {
        let engine = SyncEngine::new(
            config(),
            MockTicketApi::new(),
            MockChannel::open(),
            RecordingSink::default(),
        );
        let err = engine.set_scope("Billing").await.unwrap_err();
        assert!(matches!(err, SyncError::NoAccess(group) if group == "Billing"));
        assert!(engine.scope().is_none());
    }

    #[tokio::test]
    async fn test_chat_filter_and_snapshot() {
        let api = MockTicketApi::new();
        api.set_page(
            "Sales",
            1,
            page(vec![ticket(1, "Sales", "New", 0), ticket(2, "Sales", "New", 4)], 1),
        );
        let engine = SyncEngine::new(config(), api, MockChannel::default(), RecordingSink::default());
        engine.set_scope("Sales").await.unwrap();

        engine.set_chat_filter(FilterSet::new().unseen_only());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.tickets.len(), 2);
        assert_eq!(snapshot.chat_tickets.len(), 1);
        assert_eq!(snapshot.chat_tickets[0].id, 2);
        assert_eq!(snapshot.unseen_total, 4);
        assert_eq!(snapshot.scope.map(|s| s.group_title), Some("Sales".to_string()));
    }

    #[tokio::test]
    async fn test_run_consumes_events_until_closed() {
        let api = MockTicketApi::new();
        api.set_page("Sales", 1, page(vec![ticket(1, "Sales", "New", 0)], 1));
        let sink = RecordingSink::default();
        let engine = SyncEngine::new(config(), api, MockChannel::default(), sink.clone());
        engine.set_scope("Sales").await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let seen = PushMessage::decode(r#"{"type":"seen","data":{"ticket_id":1,"client_id":3}}"#)
            .unwrap();
        tx.send(PushEvent::Message(seen)).await.unwrap();
        tx.send(PushEvent::Disconnected).await.unwrap();
        drop(tx);

        engine.run(rx).await;
        assert!(sink.all().contains(&SyncNotification::MessageSeen {
            ticket_id: 1,
            client_id: 3
        }));
    }

    #[tokio::test]
    async fn test_access_policy_update_changes_caller() {
        let engine = SyncEngine::new(
            config(),
            MockTicketApi::new(),
            MockChannel::default(),
            RecordingSink::default(),
        );
        engine.set_access_policy(AccessPolicy::new(11));
        assert_eq!(engine.access_policy().user_id, 11);
        assert_eq!(engine.state.lock().match_context().user_id, 11);
        assert!(matches!(
            engine.set_scope("Sales").await,
            Err(SyncError::NoAccess(_))
        ));
    }

    #[tokio::test]
    async fn test_new_caller_forgets_delivered_messages() {
        let api = MockTicketApi::new();
        api.set_page("Sales", 1, page(vec![ticket(1, "Sales", "New", 0)], 1));
        let sink = RecordingSink::default();
        let engine = SyncEngine::new(config(), api, MockChannel::default(), sink.clone());
        engine.set_scope("Sales").await.unwrap();
        let message = PushMessage::decode(
            r#"{"type":"message","data":{"ticket_id":1,"message":"hi","mtype":"text","sender_id":55,"message_id":"m-1"}}"#,
        )
        .unwrap();

        engine.handle_push(message.clone()).await;
        // Same caller, refreshed entitlements: still a duplicate
        engine.set_access_policy(config().access);
        engine.handle_push(message.clone()).await;
        assert_eq!(sink.new_messages(), 1);

        engine.set_access_policy(
            AccessPolicy::new(11).with_group("Sales", GroupAccess::new(["New"], true)),
        );
        engine.handle_push(message).await;
        assert_eq!(sink.new_messages(), 2);
    }
}
