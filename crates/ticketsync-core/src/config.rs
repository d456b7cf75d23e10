use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::SyncError;
use crate::filter::MatchContext;
use crate::models::AccessPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub search_path: String,
    pub ticket_path: String,
    pub push_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Sender id the server uses for automated messages.
    pub system_sender_id: i64,
    pub sort_by: String,
    pub order: String,
    pub excluded_workflows: Vec<String>,
    pub dedup_capacity: usize,
    pub room_batch_size: usize,
    pub channel_poll_interval_ms: u64,
    pub channel_poll_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub access: AccessPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            ticket_path: DEFAULT_TICKET_PATH.to_string(),
            push_url: "ws://localhost:8080/ws".to_string(),
            auth_token: None,
            system_sender_id: DEFAULT_SYSTEM_SENDER_ID,
            sort_by: DEFAULT_SORT_BY.to_string(),
            order: DEFAULT_ORDER.to_string(),
            excluded_workflows: DEFAULT_EXCLUDED_WORKFLOWS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            room_batch_size: DEFAULT_ROOM_BATCH_SIZE,
            channel_poll_interval_ms: DEFAULT_CHANNEL_POLL_INTERVAL_MS,
            channel_poll_attempts: DEFAULT_CHANNEL_POLL_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            access: AccessPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// `<config dir>/ticketsync/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ticketsync").join("config.json"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SyncError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `TICKETSYNC_API_URL`, `TICKETSYNC_PUSH_URL` and `TICKETSYNC_TOKEN`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TICKETSYNC_API_URL") {
            self.api_base_url = url;
        }
        if let Ok(url) = std::env::var("TICKETSYNC_PUSH_URL") {
            self.push_url = url;
        }
        if let Ok(token) = std::env::var("TICKETSYNC_TOKEN") {
            self.auth_token = Some(token).filter(|t| !t.is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.api_base_url.trim().is_empty() {
            return Err(SyncError::Config("api_base_url is empty".to_string()));
        }
        if self.push_url.trim().is_empty() {
            return Err(SyncError::Config("push_url is empty".to_string()));
        }
        if self.room_batch_size == 0 {
            return Err(SyncError::Config("room_batch_size must be positive".to_string()));
        }
        if self.dedup_capacity == 0 {
            return Err(SyncError::Config("dedup_capacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn match_context(&self) -> MatchContext {
        MatchContext {
            user_id: self.access.user_id,
            system_sender_id: self.system_sender_id,
        }
    }

    pub fn channel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.channel_poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupAccess;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "api_base_url": "https://crm.example.com",
                "access": { "user_id": 7, "groups": { "Sales": { "workflows": ["New"], "privileged": true } } }
            }"#,
        )
        .unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.api_base_url, "https://crm.example.com");
        assert_eq!(config.room_batch_size, 50);
        assert_eq!(config.dedup_capacity, 1000);
        assert_eq!(config.access.user_id, 7);
        assert!(config.access.scope_for("Sales").is_some_and(|s| s.privileged));
        assert_eq!(config.match_context().user_id, 7);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = SyncConfig::default();
        config.access = AccessPolicy::new(3).with_group("Support", GroupAccess::new(["Open"], false));
        config.save(&path).unwrap();

        assert_eq!(SyncConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_zero_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "room_batch_size": 0 }"#).unwrap();

        let err = SyncConfig::load(&path).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
