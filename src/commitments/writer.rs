//! Ledger writer used by the `commitments` operator tool
//!
//! This is the out-of-process side of the ledger: the append executable and
//! the status editor. The hook paths never call into it.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::record::{CommitmentRecord, CommitmentStatus};
use super::recorder::CommitmentRequest;
use crate::error::{CommitmentError, Result};

#[derive(Debug, Clone)]
pub struct LedgerWriter {
    path: PathBuf,
}

impl LedgerWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line with a single write call.
    pub fn append(&self, record: &CommitmentRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut line = record.to_line()?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Move one open commitment to `status`, rewriting only its line.
    ///
    /// Every other line, malformed ones included, is written back
    /// unchanged. The new file replaces the old one by rename.
    pub fn set_status(&self, id: &str, status: CommitmentStatus) -> Result<CommitmentRecord> {
        let contents = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommitmentError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut updated: Option<CommitmentRecord> = None;
        let mut output: Vec<u8> = Vec::with_capacity(contents.len());
        let mut lines = contents.split(|b| *b == b'\n').peekable();

        while let Some(raw) = lines.next() {
            let mut replacement = None;
            if updated.is_none() {
                let parsed = std::str::from_utf8(raw)
                    .ok()
                    .and_then(|text| CommitmentRecord::from_line(text.trim()).ok());
                if let Some(mut record) = parsed.filter(|r| r.id == id) {
                    if !record.status.can_transition_to(status) {
                        return Err(CommitmentError::InvalidTransition {
                            from: record.status,
                            to: status,
                        });
                    }
                    record.status = status;
                    replacement = Some(record.to_line()?);
                    updated = Some(record);
                }
            }

            match replacement {
                Some(line) => output.extend_from_slice(line.as_bytes()),
                None => output.extend_from_slice(raw),
            }
            if lines.peek().is_some() {
                output.push(b'\n');
            }
        }

        let record = updated.ok_or_else(|| CommitmentError::NotFound(id.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(&output)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        tracing::info!("Marked commitment {} as {}", record.id, status);
        Ok(record)
    }

    /// Every parseable record, in line order, regardless of status or age.
    pub fn read_all(&self) -> Result<Vec<CommitmentRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| CommitmentRecord::from_line(l.trim()).ok())
            .collect())
    }
}

/// Fields the append tool accepts for one new commitment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommitment {
    pub who: String,
    pub channel: String,
    pub what: String,
    pub due_at: DateTime<Utc>,
    pub context: Option<String>,
    pub original_text: Option<String>,
    pub session_key: Option<String>,
}

impl NewCommitment {
    pub fn new(
        who: impl Into<String>,
        channel: impl Into<String>,
        what: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            who: who.into(),
            channel: channel.into(),
            what: what.into(),
            due_at,
            context: None,
            original_text: None,
            session_key: None,
        }
    }
}

impl From<CommitmentRequest> for NewCommitment {
    fn from(request: CommitmentRequest) -> Self {
        Self {
            context: Some(request.context),
            ..Self::new(request.who, request.channel, request.what, request.due_at)
        }
    }
}

/// Build the record the append tool writes. Empty optional fields are dropped.
pub fn new_commitment(fields: NewCommitment, now: DateTime<Utc>) -> CommitmentRecord {
    let mut record =
        CommitmentRecord::open(fields.who, fields.channel, fields.what, fields.due_at, now);
    record.context = fields.context.filter(|c| !c.is_empty());
    record.original_text = fields.original_text.filter(|t| !t.is_empty());
    record.session_key = fields.session_key.filter(|s| !s.is_empty());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitments::ledger::LedgerReader;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap()
    }

    fn record(what: &str) -> CommitmentRecord {
        new_commitment(
            NewCommitment {
                context: Some("Auto-detected".to_string()),
                session_key: Some(String::new()),
                ..NewCommitment::new("lee", "discord", what, now() + Duration::hours(4))
            },
            now(),
        )
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("promises.jsonl");
        let writer = LedgerWriter::new(&path);

        let first = record("I'll ping you");
        let second = record("I'll look into it");
        writer.append(&first).unwrap();
        writer.append(&second).unwrap();
        assert_ne!(first.id, second.id);
        assert!(first.session_key.is_none());

        let open = LedgerReader::new(&path).load_open_commitments(now()).await.unwrap();
        assert_eq!(open, vec![first, second]);
    }

    #[test]
    fn test_set_status_preserves_other_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("promises.jsonl");
        let writer = LedgerWriter::new(&path);

        let keep = record("I'll check back");
        let target = record("I'll have it done");
        writer.append(&keep).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(b"{garbage\n"))
            .unwrap();
        writer.append(&target).unwrap();

        let before = std::fs::read_to_string(&path).unwrap();
        let updated = writer.set_status(&target.id, CommitmentStatus::Fulfilled).unwrap();
        assert_eq!(updated.status, CommitmentStatus::Fulfilled);

        let after = std::fs::read_to_string(&path).unwrap();
        let before_lines: Vec<_> = before.lines().collect();
        let after_lines: Vec<_> = after.lines().collect();
        assert_eq!(after_lines.len(), 3);
        assert_eq!(after_lines[0], before_lines[0]);
        assert_eq!(after_lines[1], "{garbage");
        assert!(after.ends_with('\n'));

        let all = writer.read_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].status, CommitmentStatus::Fulfilled);
    }

    #[test]
    fn test_set_status_rejects_reversal() {
        let dir = tempdir().unwrap();
        let writer = LedgerWriter::new(dir.path().join("promises.jsonl"));
        let rec = record("I'll remind you");
        writer.append(&rec).unwrap();

        writer.set_status(&rec.id, CommitmentStatus::Expired).unwrap();
        let err = writer.set_status(&rec.id, CommitmentStatus::Fulfilled).unwrap_err();
        assert!(matches!(
            err,
            CommitmentError::InvalidTransition {
                from: CommitmentStatus::Expired,
                to: CommitmentStatus::Fulfilled
            }
        ));
        let err = writer.set_status(&rec.id, CommitmentStatus::Open).unwrap_err();
        assert!(matches!(err, CommitmentError::InvalidTransition { .. }));
    }

    #[test]
    fn test_set_status_unknown_id() {
        let dir = tempdir().unwrap();
        let writer = LedgerWriter::new(dir.path().join("promises.jsonl"));
        assert!(matches!(
            writer.set_status("nope", CommitmentStatus::Fulfilled),
            Err(CommitmentError::NotFound(_))
        ));
        writer.append(&record("I'll text you")).unwrap();
        assert!(matches!(
            writer.set_status("nope", CommitmentStatus::Fulfilled),
            Err(CommitmentError::NotFound(_))
        ));
    }

    #[test]
    fn test_new_commitment_from_request() {
        let request = CommitmentRequest {
            who: "-15550001".to_string(),
            channel: "sms".to_string(),
            what: "- I'll follow up tomorrow".to_string(),
            due_at: now() + Duration::hours(24),
            context: String::new(),
        };
        let record = new_commitment(request.clone().into(), now());
        assert_eq!(record.who, request.who);
        assert_eq!(record.what, request.what);
        assert_eq!(record.due_at, request.due_at);
        assert_eq!(record.created_at, now());
        assert!(record.is_open());
        assert!(record.context.is_none());
    }
}
