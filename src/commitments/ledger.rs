//! Ledger reader and staleness filter
//!
//! The ledger is shared with an external writer and is never locked here.
//! Each line is parsed on its own; a torn or garbled line is skipped and the
//! rest of the file is still read.

use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};

use super::record::CommitmentRecord;
use crate::error::Result;

pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Outcome of one pass over the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerScan {
    pub open: Vec<CommitmentRecord>,
    pub malformed: usize,
    pub closed: usize,
    pub stale: usize,
}

/// Filter ledger text down to open, fresh records in line order.
pub fn scan_ledger(contents: &[u8], now: DateTime<Utc>, max_age: Duration) -> LedgerScan {
    let mut scan = LedgerScan::default();

    for (index, raw) in contents.split(|b| *b == b'\n').enumerate() {
        let Ok(line) = std::str::from_utf8(raw) else {
            tracing::debug!("Skipping non-UTF-8 ledger line {}", index + 1);
            scan.malformed += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = match CommitmentRecord::from_line(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping malformed ledger line {}: {}", index + 1, e);
                scan.malformed += 1;
                continue;
            }
        };

        if !record.is_open() {
            scan.closed += 1;
            continue;
        }
        if now.signed_duration_since(record.created_at) > max_age {
            scan.stale += 1;
            continue;
        }
        scan.open.push(record);
    }

    scan
}

#[derive(Debug, Clone)]
pub struct LedgerReader {
    path: PathBuf,
    max_age: Duration,
}

impl LedgerReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole-file read. A missing ledger is an empty ledger.
    pub async fn scan(&self, now: DateTime<Utc>) -> Result<LedgerScan> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LedgerScan::default()),
            Err(e) => return Err(e.into()),
        };

        let scan = scan_ledger(&contents, now, self.max_age);
        tracing::debug!(
            "Ledger {:?}: {} open, {} closed, {} stale, {} malformed",
            self.path,
            scan.open.len(),
            scan.closed,
            scan.stale,
            scan.malformed
        );
        Ok(scan)
    }

    pub async fn load_open_commitments(&self, now: DateTime<Utc>) -> Result<Vec<CommitmentRecord>> {
        Ok(self.scan(now).await?.open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitments::record::CommitmentStatus;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    fn line(id: &str, created: DateTime<Utc>, status: CommitmentStatus) -> String {
        let mut record = CommitmentRecord::open("sam", "telegram", "I'll check on it", created, created);
        record.id = id.to_string();
        record.status = status;
        record.to_line().unwrap()
    }

    #[test]
    fn test_filters_closed_and_stale() {
        let contents = [
            line("a", now() - Duration::hours(1), CommitmentStatus::Open),
            line("b", now() - Duration::hours(2), CommitmentStatus::Fulfilled),
            line("c", now() - Duration::days(8), CommitmentStatus::Open),
            line("d", now() - Duration::days(3), CommitmentStatus::Expired),
            line("e", now() - Duration::days(6), CommitmentStatus::Open),
        ]
        .join("\n");

        let scan = scan_ledger(contents.as_bytes(), now(), Duration::days(7));
        let ids: Vec<_> = scan.open.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "e"]);
        assert_eq!(scan.closed, 2);
        assert_eq!(scan.stale, 1);
        assert_eq!(scan.malformed, 0);
    }

    #[test]
    fn test_age_boundary() {
        let max_age = Duration::days(7);
        let exact = line("exact", now() - max_age, CommitmentStatus::Open);
        let over = line("over", now() - max_age - Duration::seconds(1), CommitmentStatus::Open);
        let future = line("future", now() + Duration::hours(1), CommitmentStatus::Open);
        let contents = format!("{exact}\n{over}\n{future}\n");

        let scan = scan_ledger(contents.as_bytes(), now(), max_age);
        let ids: Vec<_> = scan.open.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "future"]);
        assert_eq!(scan.stale, 1);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let good_a = line("a", now() - Duration::hours(1), CommitmentStatus::Open);
        let good_b = line("b", now() - Duration::hours(3), CommitmentStatus::Open);
        let torn = &good_b[..good_b.len() / 2];
        let mut contents = format!("{good_a}\n\n   \n{torn}{good_b}\nnot json at all\n").into_bytes();
        contents.extend_from_slice(&[0xff, 0xfe, b'\n']);
        contents.extend_from_slice(good_b.as_bytes());

        let scan = scan_ledger(&contents, now(), Duration::days(7));
        let ids: Vec<_> = scan.open.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(scan.malformed, 3);
    }

    #[tokio::test]
    async fn test_missing_ledger_is_empty() {
        let dir = tempdir().unwrap();
        let reader = LedgerReader::new(dir.path().join("promises.jsonl"));
        assert!(reader.load_open_commitments(now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_is_repeatable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("promises.jsonl");
        let contents = [
            line("x", now() - Duration::hours(5), CommitmentStatus::Open),
            "{\"id\":".to_string(),
            line("y", now() - Duration::days(1), CommitmentStatus::Open),
        ]
        .join("\n");
        std::fs::write(&path, contents).unwrap();

        let reader = LedgerReader::new(&path);
        let first = reader.load_open_commitments(now()).await.unwrap();
        let second = reader.load_open_commitments(now()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_custom_max_age() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("promises.jsonl");
        std::fs::write(&path, line("x", now() - Duration::days(2), CommitmentStatus::Open)).unwrap();

        let reader = LedgerReader::new(&path).with_max_age(Duration::days(1));
        assert!(reader.load_open_commitments(now()).await.unwrap().is_empty());
    }
}
