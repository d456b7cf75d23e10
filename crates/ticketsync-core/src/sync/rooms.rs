use std::sync::atomic::Ordering;

use super::SyncEngine;
use crate::api::TicketApi;
use crate::models::{OutboundFrame, TicketId};
use crate::push::PushChannel;

impl<A: TicketApi, C: PushChannel> SyncEngine<A, C> {
    /// Subscribe to the rooms of every ticket in the main view.
    ///
    /// If the channel is down this polls until it opens, up to the configured
    /// attempt count. A newer call (scope change or reconnect) supersedes a
    /// pending one, which then gives up without sending. Returns the number of
    /// frames sent.
    pub async fn subscribe_rooms(&self) -> usize {
        let generation = self.room_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ids = self.state.lock().main().ids();
        if ids.is_empty() {
            tracing::debug!("no rooms to join");
            return 0;
        }

        if !self.wait_for_channel(generation).await {
            return 0;
        }
        // The main view may have moved on while waiting
        let ids = self.state.lock().main().ids();
        self.send_batches(&ids)
    }

    /// Join a single room right away. No-op while the channel is down; the
    /// next reconnect picks the ticket up with the rest of the main view.
    pub fn join_room(&self, id: TicketId) -> bool {
        if !self.channel.is_open() {
            return false;
        }
        match self.channel.send(&OutboundFrame::connect(&[id])) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(ticket_id = id, error = %e, "failed to join room");
                false
            }
        }
    }

    async fn wait_for_channel(&self, generation: u64) -> bool {
        let mut attempts = 0;
        loop {
            if self.room_generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "room subscription superseded");
                return false;
            }
            if self.channel.is_open() {
                return true;
            }
            if attempts >= self.config.channel_poll_attempts {
                tracing::warn!(attempts, "push channel never opened, rooms not joined");
                return false;
            }
            attempts += 1;
            tokio::time::sleep(self.config.channel_poll_interval()).await;
        }
    }

    fn send_batches(&self, ids: &[TicketId]) -> usize {
        let batch_size = self.config.room_batch_size.max(1);
        let mut sent = 0;
        for batch in ids.chunks(batch_size) {
            if let Err(e) = self.channel.send(&OutboundFrame::connect(batch)) {
                tracing::warn!(error = %e, sent, "room subscription interrupted");
                break;
            }
            sent += 1;
        }
        tracing::debug!(rooms = ids.len(), frames = sent, "joined rooms");
        sent
    }
}
