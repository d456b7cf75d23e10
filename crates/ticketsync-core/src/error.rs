#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Push channel closed")]
    ChannelClosed,
    #[error("No access to group {0}")]
    NoAccess(String),
    #[error("Invalid config: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// True for failures that happened talking to the server, as opposed to local misuse.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http { .. })
    }
}
