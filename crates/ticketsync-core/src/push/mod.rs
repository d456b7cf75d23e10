pub mod socket_client;

use crate::error::SyncError;
use crate::models::{OutboundFrame, PushMessage};

pub use socket_client::{PushHandle, SocketPushClient};

/// What the push connection reports to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A (re)connection completed. Room subscriptions from before are gone.
    Connected,
    Disconnected,
    Message(PushMessage),
}

/// Outbound side of the push connection.
pub trait PushChannel: Send + Sync + 'static {
    fn is_open(&self) -> bool;

    /// Queue a frame on the open connection. Fails with [`SyncError::ChannelClosed`]
    /// when there is no connection.
    fn send(&self, frame: &OutboundFrame) -> Result<(), SyncError>;
}
