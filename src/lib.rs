//! Promise Tracker - commitment tracking for chat agents
//!
//! Detects promises an agent makes in outbound messages, records them in an
//! append-only JSONL ledger through an external script, and injects the
//! still-open ones into the agent's context when a new session starts.

pub mod commitments;
pub mod config;
pub mod error;
pub mod plugins;

pub use commitments::{CommitmentRecord, CommitmentStatus};
pub use config::{load_toml_config, TomlConfig};
pub use error::{CommitmentError, Result};
pub use plugins::{build_registry, HookRegistry, PromiseGuard, PromiseTracker};

/// Install the fmt subscriber for hosts that embed the hooks.
/// `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}
