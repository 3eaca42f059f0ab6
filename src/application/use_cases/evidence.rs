use crate::domain::catalog::{ExecutionStatus, StepResult, TestStep};
use crate::domain::report::TestRecord;
use crate::domain::status_map::StatusMap;
use once_cell::sync::Lazy;
use regex::Regex;

static NEWLINE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n").unwrap());

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").unwrap());

/// Keeps the layout of runner output inside the catalog's HTML result field.
pub fn escape_block(text: &str) -> String {
    let with_breaks = NEWLINE_PATTERN.replace_all(text, "<br>");
    WHITESPACE_PATTERN
        .replace_all(&with_breaks, "&emsp;")
        .into_owned()
}

/// Renders step evidence and maps record statuses for one run.
#[derive(Debug, Clone)]
pub struct EvidenceRenderer {
    statuses: StatusMap,
    screenshot_base: Option<String>,
    placeholder: Option<String>,
}

impl EvidenceRenderer {
    pub fn new(statuses: StatusMap) -> Self {
        Self {
            statuses,
            screenshot_base: None,
            placeholder: None,
        }
    }

    /// Screenshots resolve to `https://{domain}/{run_id}/{file}`.
    pub fn with_screenshots(mut self, report_domain: Option<&str>, run_id: &str) -> Self {
        self.screenshot_base = report_domain
            .map(|domain| domain.trim().trim_end_matches('/'))
            .filter(|domain| !domain.is_empty())
            .map(|domain| format!("https://{}/{}", domain, run_id));
        self
    }

    /// Actual result written for records that carry no evidence at all.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn status_of(&self, record: &TestRecord) -> ExecutionStatus {
        self.statuses.map(&record.status)
    }

    pub fn overall_status(&self, records: &[TestRecord]) -> ExecutionStatus {
        ExecutionStatus::roll_up(records.iter().map(|record| self.status_of(record)))
    }

    pub fn steps(&self, records: &[TestRecord]) -> Vec<TestStep> {
        records
            .iter()
            .map(|record| TestStep::inline(record.title.clone()))
            .collect()
    }

    pub fn step_results(&self, records: &[TestRecord]) -> Vec<StepResult> {
        records
            .iter()
            .map(|record| StepResult {
                status_name: self.status_of(record),
                actual_result: self.render(record).or_else(|| self.placeholder.clone()),
            })
            .collect()
    }

    pub fn render(&self, record: &TestRecord) -> Option<String> {
        let mut html = String::new();

        if let (Some(base), Some(file)) = (&self.screenshot_base, record.screenshot.as_deref()) {
            html.push_str(&format!("<img src=\"{}/{}\" />", base, file));
        }

        if !record.failure_messages.is_empty() {
            html.push_str("<b>Failure Messages:</b><br>");
            for message in &record.failure_messages {
                html.push_str(&escape_block(message));
                html.push_str("<br>");
            }
        }

        if let Some(trace) = record.stack_trace.as_deref().filter(|t| !t.trim().is_empty()) {
            html.push_str("<b>Stacktrace:</b><br>");
            html.push_str(&escape_block(trace));
        }

        if html.is_empty() {
            None
        } else {
            Some(html)
        }
    }
}
