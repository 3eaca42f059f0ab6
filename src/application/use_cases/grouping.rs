use crate::domain::error::{AppError, Result};
use crate::domain::report::{GroupKey, TestGroup, TestRecord};
use std::collections::BTreeMap;

const DEFAULT_FEATURE: &str = "general";

/// Where a group's test case lives in the catalog and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderPolicy {
    /// Folder named after the first record's ancestor suite; test case named
    /// after the ticket.
    AncestorSuite,
    /// One group per (ticket, feature); folder `"{Feature} verifications by {suffix}"`.
    Feature { suffix: String },
    /// Folding key is `Folder/Suite`.
    FeaturePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub folder: String,
    pub test_case: String,
}

#[derive(Debug, Default)]
pub struct Partition {
    pub groups: Vec<TestGroup>,
    pub skipped: usize,
}

impl FolderPolicy {
    /// Groups records by ticket key, keeping record order inside each group.
    /// Records with no ticket key are counted and dropped.
    pub fn partition(&self, records: Vec<TestRecord>) -> Partition {
        let mut grouped: BTreeMap<GroupKey, Vec<TestRecord>> = BTreeMap::new();
        let mut skipped = 0;

        for record in records {
            let issue_key = match record.grouping_key.as_deref().map(str::trim) {
                Some(key) if !key.is_empty() => key.to_string(),
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let bucket = match self {
                FolderPolicy::Feature { .. } => Some(
                    record
                        .folding_key
                        .as_deref()
                        .map(str::trim)
                        .filter(|feature| !feature.is_empty())
                        .unwrap_or(DEFAULT_FEATURE)
                        .to_string(),
                ),
                _ => None,
            };
            grouped
                .entry(GroupKey { issue_key, bucket })
                .or_default()
                .push(record);
        }

        Partition {
            groups: grouped
                .into_iter()
                .map(|(key, records)| TestGroup { key, records })
                .collect(),
            skipped,
        }
    }

    pub fn placement(&self, group: &TestGroup, ticket_title: &str) -> Result<Placement> {
        match self {
            FolderPolicy::AncestorSuite => Ok(Placement {
                folder: first_folding_key(group)?.to_string(),
                test_case: ticket_title.to_string(),
            }),
            FolderPolicy::Feature { suffix } => {
                let feature = group.key.bucket.as_deref().unwrap_or(DEFAULT_FEATURE);
                Ok(Placement {
                    folder: format!("{} verifications by {}", capitalize(feature), suffix),
                    test_case: format!("{} verifications", ticket_title),
                })
            }
            FolderPolicy::FeaturePath => {
                let path = first_folding_key(group)?;
                let mut segments = path.splitn(2, '/').map(str::trim);
                let folder = segments.next().unwrap_or_default();
                if folder.is_empty() {
                    return Err(AppError::InvalidRecord(format!(
                        "Feature path '{}' of group {} has no folder segment",
                        path, group.key
                    )));
                }
                let test_case = segments
                    .next()
                    .filter(|suite| !suite.is_empty())
                    .unwrap_or(ticket_title);
                Ok(Placement {
                    folder: folder.to_string(),
                    test_case: test_case.to_string(),
                })
            }
        }
    }

    /// Feature groups report "Verified" for steps without evidence.
    pub fn evidence_placeholder(&self) -> Option<&'static str> {
        match self {
            FolderPolicy::Feature { .. } => Some("Verified"),
            _ => None,
        }
    }
}

fn first_folding_key(group: &TestGroup) -> Result<&str> {
    group
        .records
        .first()
        .and_then(|record| record.folding_key.as_deref())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            AppError::InvalidRecord(format!("Group {} has no folder name", group.key))
        })
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(issue: Option<&str>, folding: Option<&str>, title: &str) -> TestRecord {
        TestRecord {
            title: title.to_string(),
            full_name: title.to_string(),
            status: "passed".to_string(),
            failure_messages: Vec::new(),
            grouping_key: issue.map(str::to_string),
            folding_key: folding.map(str::to_string),
            screenshot: None,
            stack_trace: None,
        }
    }

    #[test]
    fn test_partition_by_ticket_skips_unkeyed_records() {
        let partition = FolderPolicy::AncestorSuite.partition(vec![
            record(Some("ED-2"), Some("Cart"), "Verify a"),
            record(None, Some("Cart"), "Verify b"),
            record(Some("ED-1"), Some("Login"), "Verify c"),
            record(Some("ED-2"), Some("Cart"), "Verify d"),
            record(Some("  "), None, "Verify e"),
        ]);

        assert_eq!(partition.skipped, 2);
        assert_eq!(partition.groups.len(), 2);
        assert_eq!(partition.groups[0].key.issue_key, "ED-1");
        let titles: Vec<_> = partition.groups[1]
            .records
            .iter()
            .map(|r| r.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Verify a", "Verify d"]);
    }

    #[test]
    fn test_feature_policy_splits_ticket_per_feature() {
        let policy = FolderPolicy::Feature {
            suffix: "Frontend Unit Tests".to_string(),
        };
        let partition = policy.partition(vec![
            record(Some("ED-5"), Some("search"), "Verify a"),
            record(Some("ED-5"), None, "Verify b"),
            record(Some("ED-5"), Some("search"), "Verify c"),
        ]);

        assert_eq!(partition.groups.len(), 2);
        let general = &partition.groups[0];
        assert_eq!(general.key.to_string(), "ED-5[general]");
        assert_eq!(
            policy.placement(general, "Search page").unwrap(),
            Placement {
                folder: "General verifications by Frontend Unit Tests".to_string(),
                test_case: "Search page verifications".to_string(),
            }
        );
        assert_eq!(partition.groups[1].records.len(), 2);
    }

    #[test]
    fn test_ancestor_suite_requires_folding_key() {
        let group = TestGroup {
            key: GroupKey {
                issue_key: "ED-9".to_string(),
                bucket: None,
            },
            records: vec![record(Some("ED-9"), None, "Verify a")],
        };

        assert!(matches!(
            FolderPolicy::AncestorSuite.placement(&group, "Title"),
            Err(AppError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_feature_path_placement() {
        let group = |folding: &str| TestGroup {
            key: GroupKey {
                issue_key: "ED-4".to_string(),
                bucket: None,
            },
            records: vec![record(Some("ED-4"), Some(folding), "Verify a")],
        };

        assert_eq!(
            FolderPolicy::FeaturePath
                .placement(&group("Payments/Refund flow"), "Refunds")
                .unwrap(),
            Placement {
                folder: "Payments".to_string(),
                test_case: "Refund flow".to_string(),
            }
        );
        assert_eq!(
            FolderPolicy::FeaturePath
                .placement(&group("Payments"), "Refunds")
                .unwrap()
                .test_case,
            "Refunds"
        );
        assert!(FolderPolicy::FeaturePath
            .placement(&group("/Refund flow"), "Refunds")
            .is_err());
    }
}
