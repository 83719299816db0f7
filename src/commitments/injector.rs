//! Context injection of open commitments into bootstrap files
//!
//! Target priority, first match wins:
//! 1. a file named `memory.md` (any case)
//! 2. the first file that already has content
//!
//! No file is ever created. If neither exists the block is dropped and the
//! outcome says how many commitments were left out.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::record::CommitmentRecord;

pub const MEMORY_FILE_NAME: &str = "memory.md";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapFile {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl BootstrapFile {
    pub fn new(name: impl Into<String>, path: impl Into<String>, content: Option<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            content,
        }
    }

    pub fn is_memory_file(&self) -> bool {
        Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(MEMORY_FILE_NAME))
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn append(&mut self, block: &str) {
        self.content.get_or_insert_with(String::new).push_str(block);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapContext {
    #[serde(default)]
    pub bootstrap_files: Vec<BootstrapFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InjectionOutcome {
    Nothing,
    Injected { file: String, count: usize },
    NoTarget { count: usize },
}

#[derive(Debug, Clone)]
pub struct ContextInjector {
    /// Shown in the reminder line so the agent knows where to mark items done.
    ledger_hint: String,
}

impl ContextInjector {
    pub fn new(ledger_hint: impl Into<String>) -> Self {
        Self {
            ledger_hint: ledger_hint.into(),
        }
    }

    pub fn render(&self, commitments: &[CommitmentRecord], now: DateTime<Utc>) -> String {
        if commitments.is_empty() {
            return String::new();
        }

        let mut lines: Vec<String> = vec![
            String::new(),
            "---".to_string(),
            "## ⚠️ OPEN COMMITMENTS".to_string(),
            String::new(),
            "You have made the following promises that are still open:".to_string(),
            String::new(),
        ];

        for (i, c) in commitments.iter().enumerate() {
            let overdue = if c.is_overdue(now) { " **[OVERDUE]**" } else { "" };
            lines.push(format!("### {}. {}{}", i + 1, c.id, overdue));
            lines.push(format!("- **To:** {} ({})", c.who, c.channel));
            lines.push(format!(
                "- **Due:** {}",
                c.due_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ));
            lines.push(format!("- **What:** \"{}\"", c.what));
            lines.push(String::new());
        }

        lines.push(format!(
            "*Address these commitments or mark them as fulfilled by updating {}*",
            self.ledger_hint
        ));
        lines.push("---".to_string());
        lines.push(String::new());

        lines.join("\n")
    }

    /// Index of the file the block should go into.
    pub fn select_target(files: &[BootstrapFile]) -> Option<usize> {
        files
            .iter()
            .position(BootstrapFile::is_memory_file)
            .or_else(|| files.iter().position(BootstrapFile::has_content))
    }

    pub fn inject(
        &self,
        commitments: &[CommitmentRecord],
        context: &mut BootstrapContext,
        now: DateTime<Utc>,
    ) -> InjectionOutcome {
        if commitments.is_empty() {
            return InjectionOutcome::Nothing;
        }

        let count = commitments.len();
        let Some(index) = Self::select_target(&context.bootstrap_files) else {
            tracing::info!("No writable bootstrap file found, {} commitment(s) not injected", count);
            return InjectionOutcome::NoTarget { count };
        };

        let block = self.render(commitments, now);
        let file = &mut context.bootstrap_files[index];
        file.append(&block);
        tracing::info!("Injected {} commitment(s) into {} context", count, file.name);

        InjectionOutcome::Injected {
            file: file.name.clone(),
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap()
    }

    fn commitment(id: &str, due_in: Duration) -> CommitmentRecord {
        let mut c = CommitmentRecord::open(
            "+15550001",
            "imessage",
            "I'll follow up with you tomorrow",
            now() + due_in,
            now() - Duration::hours(1),
        );
        c.id = id.to_string();
        c
    }

    fn injector() -> ContextInjector {
        ContextInjector::new("~/.config/promise-tracker/promises.jsonl")
    }

    #[test]
    fn test_render_layout() {
        let block = injector().render(
            &[commitment("p-1", Duration::hours(-2)), commitment("p-2", Duration::hours(3))],
            now(),
        );
        let lines: Vec<_> = block.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "---");
        assert_eq!(lines[2], "## ⚠️ OPEN COMMITMENTS");
        assert!(block.contains("### 1. p-1 **[OVERDUE]**\n"));
        assert!(block.contains("### 2. p-2\n"));
        assert!(block.contains("- **To:** +15550001 (imessage)"));
        assert!(block.contains("- **Due:** 2026-08-20T13:00:00.000Z"));
        assert!(block.contains("- **What:** \"I'll follow up with you tomorrow\""));
        assert!(block.contains("by updating ~/.config/promise-tracker/promises.jsonl*"));
        assert!(block.ends_with("---\n"));
        assert!(block.find("p-1").unwrap() < block.find("p-2").unwrap());
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(injector().render(&[], now()), "");
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut ctx = BootstrapContext {
            bootstrap_files: vec![BootstrapFile::new("MEMORY.md", "/ws/MEMORY.md", Some("notes".into()))],
        };
        let before = ctx.clone();
        assert_eq!(injector().inject(&[], &mut ctx, now()), InjectionOutcome::Nothing);
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_memory_file_wins_over_earlier_content() {
        let mut ctx = BootstrapContext {
            bootstrap_files: vec![
                BootstrapFile::new("AGENTS.md", "/ws/AGENTS.md", Some("rules".into())),
                BootstrapFile::new("memory.md", "/ws/Memory.MD", None),
            ],
        };
        let outcome = injector().inject(&[commitment("p-1", Duration::hours(1))], &mut ctx, now());
        assert_eq!(
            outcome,
            InjectionOutcome::Injected {
                file: "memory.md".to_string(),
                count: 1
            }
        );
        assert_eq!(ctx.bootstrap_files[0].content.as_deref(), Some("rules"));
        let memory = ctx.bootstrap_files[1].content.as_deref().unwrap();
        assert!(memory.starts_with("\n---\n## ⚠️ OPEN COMMITMENTS"));
    }

    #[test]
    fn test_memory_match_is_on_file_name() {
        let file = BootstrapFile::new("x", "/ws/notmemory.md", Some("a".into()));
        assert!(!file.is_memory_file());
        assert!(BootstrapFile::new("x", "MEMORY.md", None).is_memory_file());
    }

    #[test]
    fn test_falls_back_to_first_file_with_content() {
        let mut ctx = BootstrapContext {
            bootstrap_files: vec![
                BootstrapFile::new("EMPTY.md", "/ws/EMPTY.md", Some(String::new())),
                BootstrapFile::new("NONE.md", "/ws/NONE.md", None),
                BootstrapFile::new("SOUL.md", "/ws/SOUL.md", Some("persona".into())),
                BootstrapFile::new("TOOLS.md", "/ws/TOOLS.md", Some("tools".into())),
            ],
        };
        let outcome = injector().inject(&[commitment("p-9", Duration::hours(1))], &mut ctx, now());
        assert_eq!(
            outcome,
            InjectionOutcome::Injected {
                file: "SOUL.md".to_string(),
                count: 1
            }
        );
        assert_eq!(ctx.bootstrap_files.len(), 4);
        assert!(ctx.bootstrap_files[2].content.as_deref().unwrap().starts_with("persona\n---"));
        assert_eq!(ctx.bootstrap_files[3].content.as_deref(), Some("tools"));
        assert_eq!(ctx.bootstrap_files[0].content.as_deref(), Some(""));
    }

    #[test]
    fn test_no_target() {
        let mut ctx = BootstrapContext {
            bootstrap_files: vec![BootstrapFile::new("A.md", "/ws/A.md", None)],
        };
        let before = ctx.clone();
        let outcome = injector().inject(
            &[commitment("a", Duration::hours(1)), commitment("b", Duration::hours(2))],
            &mut ctx,
            now(),
        );
        assert_eq!(outcome, InjectionOutcome::NoTarget { count: 2 });
        assert_eq!(ctx, before);
    }
}
