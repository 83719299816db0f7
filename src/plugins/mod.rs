//! Plugin system - commitment hooks wired into the host lifecycle
//!
//! - `promise-guard` on `message_sending`
//! - `promise-tracker` on `agent_bootstrap`

pub mod hooks;
pub mod promise_guard;
pub mod promise_tracker;

use std::sync::Arc;

pub use hooks::{
    AgentBootstrapEvent, AgentBootstrapHook, HookAction, HookEvent, HookPayload, HookRegistry,
    MessageSendingEvent, MessageSendingHook,
};
pub use promise_guard::{provenance_context, GuardOutcome, PromiseGuard};
pub use promise_tracker::PromiseTracker;

use crate::config::TomlConfig;
use crate::error::Result;

/// Build the hook registry for a process. Script discovery happens here,
/// once; a missing script leaves the guard in detection-only mode.
pub fn build_registry(config: &TomlConfig) -> Result<HookRegistry> {
    let mut registry = HookRegistry::new();

    if config.guard.enabled {
        let guard = PromiseGuard::from_config(&config.guard)?;
        registry.register_message_sending(Arc::new(guard));
    }

    if config.tracker.enabled {
        registry.register_agent_bootstrap(Arc::new(PromiseTracker::from_config(&config.ledger)));
    }

    tracing::info!(
        "Commitment hooks loaded (guard: {}, tracker: {})",
        config.guard.enabled,
        config.tracker.enabled
    );
    Ok(registry)
}
