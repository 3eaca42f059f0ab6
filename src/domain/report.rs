use serde::{Deserialize, Serialize};

/// Normalized test record handed over by the report parser.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub title: String,
    #[serde(default)]
    pub full_name: String,
    pub status: String,
    #[serde(default)]
    pub failure_messages: Vec<String>,
    /// Ticket key the record belongs to; records without one are not published.
    pub grouping_key: Option<String>,
    /// Feature, ancestor suite or `Folder/Suite` path, depending on the folder policy.
    pub folding_key: Option<String>,
    pub screenshot: Option<String>,
    pub stack_trace: Option<String>,
}

/// Identity of one publishable unit: a ticket, optionally narrowed to a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub issue_key: String,
    pub bucket: Option<String>,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.bucket {
            Some(bucket) => write!(f, "{}[{}]", self.issue_key, bucket),
            None => f.write_str(&self.issue_key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestGroup {
    pub key: GroupKey,
    pub records: Vec<TestRecord>,
}
