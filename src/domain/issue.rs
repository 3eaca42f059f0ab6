use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
}

/// Subset of the issue tracker's `GET issue/{key}` payload.
#[derive(Debug, Deserialize, Clone)]
pub struct IssuePayload {
    pub id: String,
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: u64,
    pub key: String,
    pub summary: String,
}
