//! Commitment records as persisted in the JSONL ledger
//!
//! One record per line, camelCase keys. Timestamps are RFC 3339 so a line
//! carrying a relative or garbled `dueAt` fails to parse and is skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentStatus {
    Open,
    Fulfilled,
    Expired,
}

impl CommitmentStatus {
    /// Status only ever moves out of `Open`, and never back.
    pub fn can_transition_to(self, next: CommitmentStatus) -> bool {
        matches!(
            (self, next),
            (CommitmentStatus::Open, CommitmentStatus::Fulfilled)
                | (CommitmentStatus::Open, CommitmentStatus::Expired)
        )
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommitmentStatus::Open => "open",
            CommitmentStatus::Fulfilled => "fulfilled",
            CommitmentStatus::Expired => "expired",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub who: String,
    pub channel: String,
    pub what: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub due_at: DateTime<Utc>,
    pub status: CommitmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

impl CommitmentRecord {
    /// New open commitment with a fresh id.
    pub fn open(
        who: impl Into<String>,
        channel: impl Into<String>,
        what: impl Into<String>,
        due_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("commit-{}", uuid::Uuid::new_v4().simple()),
            created_at,
            who: who.into(),
            channel: channel.into(),
            what: what.into(),
            original_text: None,
            context: None,
            due_at,
            status: CommitmentStatus::Open,
            session_key: None,
        }
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Single-line JSON, no trailing newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn is_open(&self) -> bool {
        self.status == CommitmentStatus::Open
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_at < now
    }
}
