// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Audit-log storage abstraction with flat-file implementation.
//!
//! Questions are never hard-deleted: every creation and committed
//! transition is appended here as one JSON line per record, keyed by the
//! owning event. The audit log is write-mostly; the in-memory store stays
//! the single source of truth for current state.
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventdesk_common::{EventId, ModerationAction, QuestionId, QuestionStatus, Role};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::{fs as tokio_fs, io::AsyncWriteExt};

/// One audit-log line: a question entering a status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub question_id: QuestionId,
    pub event_id: EventId,
    /// Absent for the initial submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<QuestionStatus>,
    pub to: QuestionStatus,
    pub role: Role,
    /// Absent for the initial submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ModerationAction>,
    pub submitter_email: String,
    pub at: DateTime<Utc>,
}

/// Trait for audit storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Append a JSON line to the event's audit log
    async fn append_audit(&self, event_id: EventId, json_line: &str) -> Result<(), AppError>;

    /// Read all audit lines for an event
    async fn read_audit(&self, event_id: EventId) -> Result<Vec<String>, AppError>;
}

/// Flat-file implementation of the Storage trait
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("events"))?;
        Ok(Self { root })
    }

    fn audit_path(&self, event_id: EventId) -> PathBuf {
        self.root
            .join("events")
            .join(event_id.to_string())
            .join("audit.log")
    }
}

#[async_trait]
impl Storage for FlatFileStorage {
    /// Append a JSON line to `audit.log`.
    async fn append_audit(&self, event_id: EventId, json_line: &str) -> Result<(), AppError> {
        let path = self.audit_path(event_id);

        // ensure directory exists
        if let Some(parent) = path.parent() {
            tokio_fs::create_dir_all(parent).await?;
        }

        let mut file = tokio_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(AppError::from)?;

        file.write_all(json_line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    /// Read all audit lines for an event
    async fn read_audit(&self, event_id: EventId) -> Result<Vec<String>, AppError> {
        let path = self.audit_path(event_id);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio_fs::read_to_string(&path).await?;
        let lines: Vec<String> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|s| s.to_string())
            .collect();

        Ok(lines)
    }
}

/// No-op storage for setups that do not retain an audit trail (tests,
/// ephemeral demo servers).
#[derive(Clone, Default)]
pub struct NullStorage;

#[async_trait]
impl Storage for NullStorage {
    async fn append_audit(&self, _event_id: EventId, _json_line: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn read_audit(&self, _event_id: EventId) -> Result<Vec<String>, AppError> {
        Ok(Vec::new())
    }
}
