//! Hook System - lifecycle events the commitment pipeline listens to
//!
//! The host runtime fires two events:
//! - `message_sending`: once per outbound message, possibly concurrently
//!   across conversations. Handlers observe only; the message always goes out.
//! - `agent_bootstrap`: once per new session, with the mutable set of
//!   bootstrap files that make up the agent's starting context.
//!
//! Handlers never see each other's state. Anything they share goes through
//! the ledger file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::commitments::BootstrapContext;

// ============================================================================
// Hook Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    MessageSending,
    AgentBootstrap,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::MessageSending => "message_sending",
            HookEvent::AgentBootstrap => "agent_bootstrap",
        }
    }
}

/// Verdict of a `message_sending` handler.
///
/// The commitment hooks only ever return `Continue`. `Block` exists for
/// handlers the host registers next to them (its own send policy); a
/// blocking host handler does not stop the commitment hooks from running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    Continue,
    Block,
}

// ============================================================================
// Hook Payload
// ============================================================================

/// Raw event as delivered by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookPayload {
    pub event: String,
    pub session_id: Option<String>,
    pub timestamp: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl HookPayload {
    pub fn new(event: HookEvent, session_id: Option<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.as_str().to_string(),
            session_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageSendingEvent {
    /// Usually a string; anything else is ignored.
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub session_key: Option<String>,
}

impl MessageSendingEvent {
    pub fn new(content: impl Into<String>, to: Option<&str>, channel: Option<&str>) -> Self {
        Self {
            content: Some(serde_json::Value::String(content.into())),
            to: to.map(str::to_string),
            channel: channel.map(str::to_string),
            session_key: None,
        }
    }

    pub fn from_payload(payload: &HookPayload) -> Self {
        let field = |key: &str| {
            payload
                .data
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        Self {
            content: payload.data.get("content").cloned(),
            to: field("to"),
            channel: field("channel"),
            session_key: payload.session_id.clone(),
        }
    }

    /// Non-empty string content, if any.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentBootstrapEvent {
    #[serde(default)]
    pub session_key: Option<String>,
    pub context: BootstrapContext,
}

// ============================================================================
// Handlers
// ============================================================================

#[async_trait]
pub trait MessageSendingHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_message_sending(&self, event: &MessageSendingEvent) -> HookAction;
}

#[async_trait]
pub trait AgentBootstrapHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_agent_bootstrap(&self, event: &mut AgentBootstrapEvent);
}

// ============================================================================
// Hook Registry
// ============================================================================

#[derive(Default, Clone)]
pub struct HookRegistry {
    message_sending: Vec<Arc<dyn MessageSendingHook>>,
    agent_bootstrap: Vec<Arc<dyn AgentBootstrapHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_message_sending(&mut self, hook: Arc<dyn MessageSendingHook>) {
        tracing::debug!("Registered message_sending hook '{}'", hook.name());
        self.message_sending.push(hook);
    }

    pub fn register_agent_bootstrap(&mut self, hook: Arc<dyn AgentBootstrapHook>) {
        tracing::debug!("Registered agent_bootstrap hook '{}'", hook.name());
        self.agent_bootstrap.push(hook);
    }

    pub fn hook_names(&self, event: HookEvent) -> Vec<String> {
        match event {
            HookEvent::MessageSending => self
                .message_sending
                .iter()
                .map(|h| h.name().to_string())
                .collect(),
            HookEvent::AgentBootstrap => self
                .agent_bootstrap
                .iter()
                .map(|h| h.name().to_string())
                .collect(),
        }
    }

    /// Runs every handler in registration order; any `Block` blocks the send.
    pub async fn fire_message_sending(&self, event: &MessageSendingEvent) -> HookAction {
        let mut action = HookAction::Continue;
        for hook in &self.message_sending {
            if hook.on_message_sending(event).await == HookAction::Block {
                tracing::info!("Hook '{}' blocked message_sending", hook.name());
                action = HookAction::Block;
            }
        }
        action
    }

    pub async fn fire_agent_bootstrap(&self, event: &mut AgentBootstrapEvent) {
        for hook in &self.agent_bootstrap {
            hook.on_agent_bootstrap(event).await;
        }
    }

    /// Dispatch a raw `message_sending` payload. Other events are ignored
    /// here because bootstrap handlers need the mutable context.
    pub async fn fire_payload(&self, payload: &HookPayload) -> HookAction {
        if payload.event != HookEvent::MessageSending.as_str() {
            return HookAction::Continue;
        }
        let event = MessageSendingEvent::from_payload(payload);
        self.fire_message_sending(&event).await
    }
}
