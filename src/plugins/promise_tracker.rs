//! Promise Tracker - injects open commitments into agent context at bootstrap

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::hooks::{AgentBootstrapEvent, AgentBootstrapHook};
use crate::commitments::{BootstrapContext, ContextInjector, InjectionOutcome, LedgerReader};
use crate::config::LedgerConfig;

#[derive(Debug, Clone)]
pub struct PromiseTracker {
    reader: LedgerReader,
    injector: ContextInjector,
}

impl PromiseTracker {
    pub fn new(reader: LedgerReader, injector: ContextInjector) -> Self {
        Self { reader, injector }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        let max_age = Duration::try_days(config.max_age_days)
            .unwrap_or_else(|| Duration::days(crate::commitments::DEFAULT_MAX_AGE_DAYS));
        let reader = LedgerReader::new(&config.path).with_max_age(max_age);
        let injector = ContextInjector::new(config.path.display().to_string());
        Self::new(reader, injector)
    }

    /// Load, filter, inject. A ledger that cannot be read counts as empty.
    pub async fn inject(&self, context: &mut BootstrapContext, now: DateTime<Utc>) -> InjectionOutcome {
        let open = match self.reader.load_open_commitments(now).await {
            Ok(open) => open,
            Err(e) => {
                tracing::error!("Failed to read ledger {:?}: {}", self.reader.path(), e);
                return InjectionOutcome::Nothing;
            }
        };

        if open.is_empty() {
            return InjectionOutcome::Nothing;
        }

        tracing::info!("Found {} open commitment(s)", open.len());
        self.injector.inject(&open, context, now)
    }
}

#[async_trait]
impl AgentBootstrapHook for PromiseTracker {
    fn name(&self) -> &str {
        "promise-tracker"
    }

    async fn on_agent_bootstrap(&self, event: &mut AgentBootstrapEvent) {
        self.inject(&mut event.context, Utc::now()).await;
    }
}
