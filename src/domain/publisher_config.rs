use crate::domain::catalog::ExecutionStatus;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use validator::Validate;

pub const DEFAULT_MAX_RETRY: u32 = 3;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_FALLBACK_SECS: u64 = 120;

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_retry_fallback_secs() -> u64 {
    DEFAULT_RETRY_FALLBACK_SECS
}

/// Test-management catalog connection (`ZEPHYR_*`).
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CatalogSettings {
    #[validate(length(min = 1, message = "catalog domain must not be empty"))]
    pub domain: String,
    #[serde(deserialize_with = "text")]
    #[validate(length(min = 1, message = "catalog token must not be empty"))]
    pub token: String,
    #[validate(length(min = 1, message = "project key must not be empty"))]
    pub project_key: String,
    pub folder_parent_id: u64,
    #[serde(default, deserialize_with = "optional_text")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub test_cycle_folder: Option<u64>,
}

/// Issue tracker connection (`JIRA_*`).
#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct IssueTrackerSettings {
    #[validate(length(min = 1, message = "issue tracker domain must not be empty"))]
    pub domain: String,
    #[serde(deserialize_with = "text")]
    #[validate(length(min = 1, message = "issue tracker token must not be empty"))]
    pub token: String,
    /// When set, the basic credential is built from `email:token`.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct PublisherConfig {
    #[validate(nested)]
    pub zephyr: CatalogSettings,
    #[validate(nested)]
    pub jira: IssueTrackerSettings,
    #[serde(default = "default_max_retry")]
    #[validate(range(min = 1, max = 20, message = "max_retry must be between 1 and 20"))]
    pub max_retry: u32,
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1, message = "http_timeout_secs must be positive"))]
    pub http_timeout_secs: u64,
    #[serde(default = "default_retry_fallback_secs")]
    pub retry_fallback_secs: u64,
    #[serde(default, deserialize_with = "optional_text")]
    pub run_id: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub serenity_report_domain: Option<String>,
    #[serde(default)]
    pub statuses: HashMap<String, ExecutionStatus>,
}

/// Identifiers embedded into the cycle name and evidence links for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: String,
    pub branch_name: String,
}

impl PublisherConfig {
    pub fn run_context(&self) -> RunContext {
        RunContext {
            run_id: self
                .run_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            branch_name: self
                .branch_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "local".to_string()),
        }
    }
}

// Environment values such as `RUN_ID=4711` arrive as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(value) => value,
            Scalar::Unsigned(value) => value.to_string(),
            Scalar::Signed(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Flag(value) => value.to_string(),
        }
    }
}

fn text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_text)
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|value| value.map(Scalar::into_text))
}
