//! Shared types for the triage pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::TriageError;
use crate::llm::Role;

// ── Email ───────────────────────────────────────────────────────────

/// An incoming email. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub sender: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Reject emails with a blank sender, subject or body.
    ///
    /// The error carries whatever sender and subject the email does have,
    /// so batch callers can tell which input was rejected.
    pub fn validate(&self) -> Result<(), TriageError> {
        let missing = if self.sender.trim().is_empty() {
            "sender"
        } else if self.subject.trim().is_empty() {
            "subject"
        } else if self.body.trim().is_empty() {
            "body"
        } else {
            return Ok(());
        };
        Err(TriageError::MalformedEmail {
            field: missing,
            sender: self.sender.clone(),
            subject: self.subject.clone(),
        })
    }
}

// ── Category ────────────────────────────────────────────────────────

/// Category assigned to a legitimate email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Inquiry,
    Complaint,
    ThankYou,
    Request,
    Information,
}

impl Category {
    /// Categories in matching priority order.
    pub const ALL: [Category; 5] = [
        Category::Inquiry,
        Category::Complaint,
        Category::ThankYou,
        Category::Request,
        Category::Information,
    ];

    /// The literal label searched for in oracle output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::Complaint => "complaint",
            Self::ThankYou => "thank-you",
            Self::Request => "request",
            Self::Information => "information",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Workflow stage ──────────────────────────────────────────────────

/// Position of a triage run in the workflow.
///
/// `Received → Classified → {Spam, Legitimate}`; spam goes straight to
/// `Done`, legitimate mail passes `Drafted` and `Notified` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Classified,
    Spam,
    Legitimate,
    Drafted,
    Notified,
    Done,
}

impl Stage {
    /// Name used in logs and the audit dump.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::Spam => "spam",
            Self::Legitimate => "legitimate",
            Self::Drafted => "drafted",
            Self::Notified => "notified",
            Self::Done => "done",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Classified)
                | (Self::Classified, Self::Spam)
                | (Self::Classified, Self::Legitimate)
                | (Self::Spam, Self::Done)
                | (Self::Legitimate, Self::Drafted)
                | (Self::Drafted, Self::Notified)
                | (Self::Notified, Self::Done)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Structured signals extracted from a classification response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_spam: bool,
    pub reason: Option<String>,
    pub category: Option<Category>,
}

// ── Transcript ──────────────────────────────────────────────────────

/// One side of an oracle exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

// ── Triage state ────────────────────────────────────────────────────

/// Per-email record threaded through the workflow.
///
/// Only the workflow engine writes to it; everyone else reads through the
/// accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageState {
    /// Run identifier, used as the email identity in logs and errors.
    pub(crate) id: Uuid,
    pub(crate) email: Email,
    pub(crate) is_spam: Option<bool>,
    pub(crate) spam_reason: Option<String>,
    pub(crate) category: Option<Category>,
    pub(crate) draft: Option<String>,
    pub(crate) stage: Stage,
    /// Every stage visited so far, in order.
    pub(crate) path: Vec<Stage>,
    transcript: Vec<TranscriptEntry>,
}

impl TriageState {
    pub fn new(email: Email) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            is_spam: None,
            spam_reason: None,
            category: None,
            draft: None,
            stage: Stage::Received,
            path: vec![Stage::Received],
            transcript: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    /// `None` until classified.
    pub fn is_spam(&self) -> Option<bool> {
        self.is_spam
    }

    pub fn spam_reason(&self) -> Option<&str> {
        self.spam_reason.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn path(&self) -> &[Stage] {
        &self.path
    }

    /// Append-only view of the oracle exchanges.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Record a prompt/response pair.
    pub(crate) fn record_exchange(&mut self, prompt: &str, response: &str) {
        let at = Utc::now();
        self.transcript.push(TranscriptEntry {
            role: Role::User,
            content: prompt.to_string(),
            at,
        });
        self.transcript.push(TranscriptEntry {
            role: Role::Assistant,
            content: response.to_string(),
            at,
        });
    }

    /// Apply a classification. Spam keeps only the reason, legitimate mail
    /// keeps only the category.
    pub(crate) fn apply_classification(&mut self, classification: Classification) {
        self.is_spam = Some(classification.is_spam);
        if classification.is_spam {
            self.spam_reason = classification.reason;
            self.category = None;
        } else {
            self.spam_reason = None;
            self.category = classification.category;
        }
    }

    /// Move to `next`. Illegal transitions are a programming error in the
    /// workflow engine and are caught in debug builds.
    pub(crate) fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage,
            next
        );
        debug!(run_id = %self.id, from = %self.stage, to = next.label(), "Stage transition");
        self.stage = next;
        self.path.push(next);
    }

    /// True when the spam/category exclusivity and draft rules hold.
    pub fn invariants_hold(&self) -> bool {
        let exclusive = !(self.spam_reason.is_some() && self.category.is_some());
        let draft_rule = match self.is_spam {
            Some(true) => self.draft.is_none(),
            Some(false) => self.stage != Stage::Done || self.draft.is_some(),
            None => self.draft.is_none() && self.spam_reason.is_none() && self.category.is_none(),
        };
        exclusive && draft_rule
    }

    /// Compare two finished states ignoring run id and transcript timestamps.
    pub fn same_outcome(&self, other: &TriageState) -> bool {
        self.email == other.email
            && self.is_spam == other.is_spam
            && self.spam_reason == other.spam_reason
            && self.category == other.category
            && self.draft == other.draft
            && self.path == other.path
            && self.transcript.len() == other.transcript.len()
            && self
                .transcript
                .iter()
                .zip(&other.transcript)
                .all(|(a, b)| a.role == b.role && a.content == b.content)
    }
}
