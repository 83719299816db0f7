//! Commitment recorder - hands detected promises to the external append script
//!
//! The script is located once at startup from an ordered candidate list.
//! Arguments go straight into the process argv, so no shell ever sees them
//! and no quoting is needed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::error::{CommitmentError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Arguments for one append invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentRequest {
    pub who: String,
    pub channel: String,
    pub what: String,
    pub due_at: DateTime<Utc>,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfirmation {
    pub exit_code: Option<i32>,
    /// Last non-empty stdout line.
    pub confirmation: String,
    pub stderr: String,
}

/// First candidate that exists wins. Bare command names are looked up on
/// `PATH`; anything with a path separator must exist on disk.
pub fn locate_script<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates.iter().find_map(|candidate| {
        let candidate = candidate.as_ref();
        if candidate.as_os_str().is_empty() {
            return None;
        }
        if candidate.components().count() == 1 && !candidate.is_absolute() {
            if candidate.exists() {
                return Some(candidate.to_path_buf());
            }
            return which::which(candidate).ok();
        }
        candidate.exists().then(|| candidate.to_path_buf())
    })
}

#[derive(Debug, Clone)]
pub struct CommitmentRecorder {
    script: PathBuf,
    prefix_args: Vec<String>,
    timeout: Duration,
}

impl CommitmentRecorder {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            prefix_args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Locate the script, or log once and return `None`.
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Option<Self> {
        match locate_script(candidates) {
            Some(script) => {
                tracing::info!("Using commitments script: {:?}", script);
                Some(Self::new(script))
            }
            None => {
                let tried: Vec<_> = candidates
                    .iter()
                    .map(|c| c.as_ref().display().to_string())
                    .collect();
                tracing::warn!(
                    "Commitments script not found - promise recording disabled (tried: {})",
                    tried.join(", ")
                );
                None
            }
        }
    }

    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn build_args(&self, request: &CommitmentRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.prefix_args.iter().map(OsString::from).collect();
        let due = request.due_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        for (flag, value) in [
            ("--who", request.who.as_str()),
            ("--channel", request.channel.as_str()),
            ("--what", request.what.as_str()),
            ("--due", due.as_str()),
            ("--context", request.context.as_str()),
        ] {
            args.push(flag.into());
            args.push(value.into());
        }
        args
    }

    /// One attempt, bounded by the timeout. The child is killed if the
    /// timeout fires; nothing is retried.
    pub async fn record(&self, request: &CommitmentRequest) -> Result<RecordConfirmation> {
        let mut command = Command::new(&self.script);
        command
            .args(self.build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| CommitmentError::Spawn {
            path: self.script.clone(),
            source,
        })?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CommitmentError::Timeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(CommitmentError::ScriptFailed {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let confirmation = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(RecordConfirmation {
            exit_code: output.status.code(),
            confirmation,
            stderr,
        })
    }
}
