//! Promise Guard - catches promises in outbound messages
//!
//! Flow: message_sending -> detect -> resolve due time -> append script.
//! Recording is best effort. Whatever happens, the message goes out as-is.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Duration;

use super::hooks::{HookAction, MessageSendingEvent, MessageSendingHook};
use crate::commitments::{
    CommitmentRecorder, CommitmentRequest, DueTimeResolver, PromiseDetector, PromiseMatch,
    RecordConfirmation,
};
use crate::config::GuardConfig;
use crate::error::Result;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Missing or non-string content.
    NoContent,
    NoPromise,
    /// Promise found but there is no script to record it with.
    DetectedOnly {
        promise: PromiseMatch,
        due_at: DateTime<Utc>,
    },
    Recorded {
        request: CommitmentRequest,
        confirmation: RecordConfirmation,
    },
    RecordFailed {
        request: CommitmentRequest,
        error: String,
    },
}

/// Provenance note passed as `--context`, cut to `max_chars` characters.
pub fn provenance_context(content: &str, max_chars: usize) -> String {
    let excerpt: String = content.chars().take(max_chars).collect();
    format!(
        "Auto-detected by promise-guard hook. Original: \"{}...\"",
        excerpt
    )
}

#[derive(Debug, Clone)]
pub struct PromiseGuard {
    detector: PromiseDetector,
    resolver: DueTimeResolver,
    recorder: Option<CommitmentRecorder>,
    original_text_chars: usize,
}

impl PromiseGuard {
    pub fn new(
        detector: PromiseDetector,
        resolver: DueTimeResolver,
        recorder: Option<CommitmentRecorder>,
    ) -> Self {
        Self {
            detector,
            resolver,
            recorder,
            original_text_chars: 200,
        }
    }

    /// Compiles the pattern table and probes for the append script once.
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        let detector = match &config.patterns {
            Some(patterns) => PromiseDetector::from_patterns(patterns)?,
            None => PromiseDetector::default(),
        };
        let resolver = DueTimeResolver::with_default_hours(config.default_followup_hours);
        let recorder = CommitmentRecorder::discover(&config.script_candidates).map(|r| {
            r.with_prefix_args(config.script_args.clone())
                .with_timeout(Duration::from_secs(config.timeout_secs))
        });

        Ok(Self::new(detector, resolver, recorder).with_original_text_chars(config.original_text_chars))
    }

    pub fn with_original_text_chars(mut self, chars: usize) -> Self {
        self.original_text_chars = chars;
        self
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub async fn evaluate(&self, event: &MessageSendingEvent, now: DateTime<Utc>) -> GuardOutcome {
        let Some(content) = event.text() else {
            return GuardOutcome::NoContent;
        };
        let Some(promise) = self.detector.detect(content) else {
            return GuardOutcome::NoPromise;
        };

        tracing::info!("Promise detected: \"{}\"", promise.fragment);
        let due_at = self.resolver.resolve(content, now);

        let Some(recorder) = &self.recorder else {
            return GuardOutcome::DetectedOnly { promise, due_at };
        };

        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(UNKNOWN)
                .to_string()
        };
        let request = CommitmentRequest {
            who: non_empty(&event.to),
            channel: non_empty(&event.channel),
            what: promise.sentence.clone(),
            due_at,
            context: provenance_context(content, self.original_text_chars),
        };

        match recorder.record(&request).await {
            Ok(confirmation) => {
                tracing::info!("Commitment created via script: {}", confirmation.confirmation);
                GuardOutcome::Recorded {
                    request,
                    confirmation,
                }
            }
            Err(e) => {
                tracing::error!("Failed to create commitment: {}", e);
                GuardOutcome::RecordFailed {
                    request,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl MessageSendingHook for PromiseGuard {
    fn name(&self) -> &str {
        "promise-guard"
    }

    async fn on_message_sending(&self, event: &MessageSendingEvent) -> HookAction {
        self.evaluate(event, Utc::now()).await;
        HookAction::Continue
    }
}
