// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::Result;
use eventdesk_common::Role;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Audit-log directory path
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Attendee session TTL in seconds
    pub session_ttl_secs: u64,
    /// Interval at which long-lived clients re-check their session
    pub guard_interval_secs: u64,
    /// A session not re-verified for this many guard intervals must
    /// re-validate instead of erroring (suspended-tab tolerance)
    pub stale_after_intervals: u32,
    /// Snapshot poll interval while the push channel is down
    pub poll_interval_secs: u64,
    /// Window-handoff token TTL in seconds
    pub window_token_ttl_secs: u64,
    /// Per-event push topic capacity
    pub topic_capacity: usize,
    /// Submission rate limiting
    pub rate_limit: RateLimitSettings,
    /// Pre-issued staff bearer credentials
    pub staff: Vec<StaffCredential>,
    /// Seeded events (event CRUD itself is an external collaborator)
    pub events: Vec<EventSeed>,
    /// Seeded attendee roster
    pub attendees: Vec<AttendeeSeed>,
}

/// Fixed-window rate limit parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// One pre-issued staff bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffCredential {
    pub token: String,
    pub role: Role,
}

/// Event seeded at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSeed {
    pub name: String,
    #[serde(default)]
    pub event_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub qa_active: bool,
}

/// Attendee record seeded at startup, keyed by the owning event's name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendeeSeed {
    pub event: String,
    pub email: String,
    pub registration_id: String,
    pub name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".parse().expect("static addr"),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            session_ttl_secs: 60 * 60 * 12, // one event day
            guard_interval_secs: 30,
            stale_after_intervals: 3,
            poll_interval_secs: 3,
            window_token_ttl_secs: 120,
            topic_capacity: 128,
            rate_limit: RateLimitSettings::default(),
            staff: Vec::new(),
            events: Vec::new(),
            attendees: Vec::new(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
        }
    }
}

impl Settings {
    /// Load settings from config files and environment variables,
    /// falling back to defaults for anything unspecified.
    pub fn load() -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"))
            .merge(Yaml::file("config.yaml"))
            .merge(Json::file("config.json"))
            .merge(Env::prefixed("EVENTDESK_"))
            .extract()?;
        Ok(settings)
    }

    /// Load settings from an explicit file path.
    pub fn load_from<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("EVENTDESK_"))
            .extract()?;
        Ok(settings)
    }

    pub fn guard_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.guard_interval_secs)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    pub fn session_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_ttl_secs)
    }

    pub fn window_token_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.window_token_ttl_secs)
    }
}
