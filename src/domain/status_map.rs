use crate::domain::catalog::ExecutionStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusPreset {
    Jest,
    Serenity,
}

/// Closed mapping from a test runner's result vocabulary to catalog statuses.
/// Anything not in the table maps to `fail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMap {
    entries: HashMap<String, ExecutionStatus>,
}

impl StatusMap {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ExecutionStatus)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(source, status)| (source.into(), status))
                .collect(),
        }
    }

    pub fn preset(preset: StatusPreset) -> Self {
        match preset {
            StatusPreset::Jest => Self::from_entries([
                ("passed", ExecutionStatus::Pass),
                ("failed", ExecutionStatus::Fail),
                ("timedOut", ExecutionStatus::Fail),
                ("skipped", ExecutionStatus::NotExecuted),
                ("pending", ExecutionStatus::NotExecuted),
                ("todo", ExecutionStatus::NotExecuted),
                ("disabled", ExecutionStatus::NotExecuted),
            ]),
            StatusPreset::Serenity => Self::from_entries([
                ("SUCCESS", ExecutionStatus::Pass),
                ("ERROR", ExecutionStatus::Fail),
                ("FAILURE", ExecutionStatus::Fail),
                ("COMPROMISED", ExecutionStatus::Blocked),
                ("SKIPPED", ExecutionStatus::NotExecuted),
                ("IGNORED", ExecutionStatus::NotExecuted),
                ("PENDING", ExecutionStatus::NotExecuted),
            ]),
        }
    }

    /// Entries from `overrides` replace or extend the current table.
    pub fn with_overrides(mut self, overrides: &HashMap<String, ExecutionStatus>) -> Self {
        for (source, status) in overrides {
            self.entries.insert(source.clone(), *status);
        }
        self
    }

    pub fn map(&self, source: &str) -> ExecutionStatus {
        self.entries
            .get(source)
            .copied()
            .unwrap_or(ExecutionStatus::Fail)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
