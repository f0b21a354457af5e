//! Terminal handlers — the final observable output of a triage run.
//!
//! Handlers read the finished state and emit a record; they never touch
//! the transcript or advance the workflow.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::types::{Category, TriageState};

/// Reason reported when the oracle flagged spam without explaining why.
pub const UNSPECIFIED_REASON: &str = "unspecified";

/// Output for an email rejected as spam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub run_id: Uuid,
    pub sender: String,
    pub subject: String,
    pub reason: String,
}

impl RejectionRecord {
    pub fn from_state(state: &TriageState) -> Self {
        Self {
            run_id: state.id,
            sender: state.email.sender.clone(),
            subject: state.email.subject.clone(),
            reason: state
                .spam_reason
                .clone()
                .unwrap_or_else(|| UNSPECIFIED_REASON.to_string()),
        }
    }
}

/// Output for a legitimate email awaiting human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub run_id: Uuid,
    pub sender: String,
    pub subject: String,
    pub category: Option<Category>,
    pub draft: String,
}

impl NotificationRecord {
    pub fn from_state(state: &TriageState) -> Self {
        Self {
            run_id: state.id,
            sender: state.email.sender.clone(),
            subject: state.email.subject.clone(),
            category: state.category,
            draft: state.draft.clone().unwrap_or_default(),
        }
    }
}

/// Either terminal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalRecord {
    Rejected(RejectionRecord),
    Notified(NotificationRecord),
}

impl TerminalRecord {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Rejected(r) => r.run_id,
            Self::Notified(n) => n.run_id,
        }
    }
}

/// Sink for the two terminal actions.
#[async_trait]
pub trait TerminalHandler: Send + Sync {
    /// Spam branch: report the rejection.
    async fn handle_spam(&self, state: &TriageState);

    /// Legitimate branch: present the draft for review.
    async fn notify(&self, state: &TriageState);
}

// ── Console ─────────────────────────────────────────────────────────

/// Prints rejections and review notices to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn render_rejection(record: &RejectionRecord) -> String {
        format!(
            "Email from {} marked as SPAM. Reason: {}\nSubject: {}\nThe email has been moved to the spam folder.",
            record.sender, record.reason, record.subject
        )
    }

    fn render_notification(record: &NotificationRecord) -> String {
        let rule = "=".repeat(50);
        let category = record
            .category
            .map(|c| c.label().to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "{rule}\nYou've received an email from {}.\nSubject: {}\nCategory: {}\n\nDraft response for your review:\n{}\n{}\n{rule}",
            record.sender,
            record.subject,
            category,
            "-".repeat(50),
            record.draft,
        )
    }
}

#[async_trait]
impl TerminalHandler for ConsoleHandler {
    async fn handle_spam(&self, state: &TriageState) {
        let record = RejectionRecord::from_state(state);
        println!("{}\n", Self::render_rejection(&record));
    }

    async fn notify(&self, state: &TriageState) {
        let record = NotificationRecord::from_state(state);
        println!("\n{}\n", Self::render_notification(&record));
    }
}

// ── Recording ───────────────────────────────────────────────────────

/// Keeps every terminal record in memory, in emission order.
pub struct RecordingHandler {
    records: RwLock<Vec<TerminalRecord>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(Vec::new()),
        })
    }

    /// All records so far, in emission order.
    pub async fn records(&self) -> Vec<TerminalRecord> {
        self.records.read().await.clone()
    }

    /// The record emitted for one run, if it reached a terminal handler.
    pub async fn record_for(&self, run_id: Uuid) -> Option<TerminalRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.run_id() == run_id)
            .cloned()
    }

    pub async fn rejections(&self) -> Vec<RejectionRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                TerminalRecord::Rejected(rec) => Some(rec.clone()),
                TerminalRecord::Notified(_) => None,
            })
            .collect()
    }

    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                TerminalRecord::Notified(rec) => Some(rec.clone()),
                TerminalRecord::Rejected(_) => None,
            })
            .collect()
    }

    async fn push(&self, record: TerminalRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl TerminalHandler for RecordingHandler {
    async fn handle_spam(&self, state: &TriageState) {
        let record = RejectionRecord::from_state(state);
        info!(run_id = %record.run_id, sender = %record.sender, reason = %record.reason, "Recorded spam rejection");
        self.push(TerminalRecord::Rejected(record)).await;
    }

    async fn notify(&self, state: &TriageState) {
        let record = NotificationRecord::from_state(state);
        info!(run_id = %record.run_id, sender = %record.sender, "Recorded review notification");
        self.push(TerminalRecord::Notified(record)).await;
    }
}
