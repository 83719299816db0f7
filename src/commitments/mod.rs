//! Commitment tracking - detect promises, record them, surface the open ones
//!
//! Write side: detector -> due_time -> recorder -> external append script.
//! Read side: ledger -> injector. The ledger file is the only shared state.

pub mod detector;
pub mod due_time;
pub mod injector;
pub mod ledger;
pub mod record;
pub mod recorder;
pub mod writer;

pub use detector::{PromiseDetector, PromiseMatch, DEFAULT_PROMISE_PATTERNS};
pub use due_time::{DueOffset, DueRule, DueTimeResolver, DEFAULT_FOLLOWUP_HOURS};
pub use injector::{BootstrapContext, BootstrapFile, ContextInjector, InjectionOutcome};
pub use ledger::{scan_ledger, LedgerReader, LedgerScan, DEFAULT_MAX_AGE_DAYS};
pub use record::{CommitmentRecord, CommitmentStatus};
pub use recorder::{locate_script, CommitmentRecorder, CommitmentRequest, RecordConfirmation};
pub use writer::{new_commitment, LedgerWriter, NewCommitment};
