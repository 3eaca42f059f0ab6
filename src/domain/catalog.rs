use serde::{Deserialize, Serialize};

/// One page of a paginated catalog listing.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    pub total: Option<u64>,
    pub is_last: Option<bool>,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TestCaseSummary {
    pub key: String,
    pub name: String,
    pub folder: Option<FolderRef>,
}

/// Response of every create call: folders return `id`, keyed entities `key`.
#[derive(Debug, Deserialize, Clone)]
pub struct CreatedEntity {
    pub id: Option<u64>,
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    #[serde(rename = "pass")]
    Pass,
    #[serde(rename = "fail")]
    Fail,
    #[serde(rename = "blocked")]
    Blocked,
    #[serde(rename = "not executed")]
    NotExecuted,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pass => "pass",
            ExecutionStatus::Fail => "fail",
            ExecutionStatus::Blocked => "blocked",
            ExecutionStatus::NotExecuted => "not executed",
        }
    }

    /// A single member that did not pass downgrades the rolled-up test case.
    pub fn roll_up<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ExecutionStatus>,
    {
        if statuses.into_iter().all(|status| status == ExecutionStatus::Pass) {
            ExecutionStatus::Pass
        } else {
            ExecutionStatus::Fail
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InlineStep {
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TestStep {
    pub inline: InlineStep,
}

impl TestStep {
    pub fn inline(description: impl Into<String>) -> Self {
        Self {
            inline: InlineStep {
                description: description.into(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub status_name: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_result: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder<'a> {
    pub name: &'a str,
    pub parent_id: u64,
    pub project_key: &'a str,
    pub folder_type: &'a str,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTestCase<'a> {
    pub project_key: &'a str,
    pub name: &'a str,
    pub folder_id: u64,
    pub status_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<&'a str>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTestCycle<'a> {
    pub project_key: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<u64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct StepUpdate<'a> {
    pub mode: &'a str,
    pub items: &'a [TestStep],
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IssueLinkRequest {
    pub issue_id: u64,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTestExecution<'a> {
    pub project_key: &'a str,
    pub test_cycle_key: &'a str,
    pub test_case_key: &'a str,
    pub status_name: ExecutionStatus,
    pub test_script_results: &'a [StepResult],
}
