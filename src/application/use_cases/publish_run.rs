use crate::application::use_cases::evidence::EvidenceRenderer;
use crate::application::use_cases::grouping::FolderPolicy;
use crate::domain::catalog::ExecutionStatus;
use crate::domain::error::{AppError, Result};
use crate::domain::report::{GroupKey, TestGroup, TestRecord};
use crate::infrastructure::clients::{JiraIssueResolver, ScaleCatalogClient};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Step of a group's pipeline, reported with the failure that stopped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStage {
    ResolveIssue,
    Placement,
    ResolveFolder,
    ResolveTestCase,
    UploadSteps,
    LinkIssues,
    Publish,
    Task,
}

impl fmt::Display for GroupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupStage::ResolveIssue => "resolve-issue",
            GroupStage::Placement => "placement",
            GroupStage::ResolveFolder => "resolve-folder",
            GroupStage::ResolveTestCase => "resolve-test-case",
            GroupStage::UploadSteps => "upload-steps",
            GroupStage::LinkIssues => "link-issues",
            GroupStage::Publish => "publish",
            GroupStage::Task => "task",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct GroupFailure {
    pub group: GroupKey,
    pub stage: GroupStage,
    pub error: AppError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedGroup {
    pub group: GroupKey,
    pub folder_id: u64,
    pub test_case_key: String,
    pub status: ExecutionStatus,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub cycle_key: Option<String>,
    pub published: Vec<PublishedGroup>,
    pub failures: Vec<GroupFailure>,
    pub skipped: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    pub name_prefix: Option<String>,
    pub folder_id: Option<u64>,
}

type StageResult<T> = std::result::Result<T, (GroupStage, AppError)>;

fn at<T>(stage: GroupStage, result: Result<T>) -> StageResult<T> {
    result.map_err(|error| (stage, error))
}

/// Test cases taken by the groups of one run. A second group landing on the
/// same test case would overwrite the first group's steps and publish twice.
#[derive(Default)]
struct TestCaseClaims {
    owners: Mutex<HashMap<String, GroupKey>>,
}

impl TestCaseClaims {
    fn claim(&self, test_case_key: &str, group: &GroupKey) -> Result<()> {
        let mut owners = self
            .owners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match owners.get(test_case_key) {
            Some(owner) if owner != group => Err(AppError::TestCaseClaimed {
                test_case_key: test_case_key.to_string(),
                owner: owner.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                owners.insert(test_case_key.to_string(), group.clone());
                Ok(())
            }
        }
    }
}

/// Publishes one run: a cycle, then every group concurrently.
///
/// A group that fails is logged and reported in the summary; its siblings
/// keep going. Only a failed cycle creation aborts the run.
#[derive(Clone)]
pub struct PublishRunUseCase {
    catalog: Arc<ScaleCatalogClient>,
    issues: Arc<JiraIssueResolver>,
    evidence: Arc<EvidenceRenderer>,
    policy: FolderPolicy,
}

impl PublishRunUseCase {
    pub fn new(
        catalog: Arc<ScaleCatalogClient>,
        issues: Arc<JiraIssueResolver>,
        evidence: EvidenceRenderer,
        policy: FolderPolicy,
    ) -> Self {
        let evidence = match policy.evidence_placeholder() {
            Some(placeholder) => evidence.with_placeholder(placeholder),
            None => evidence,
        };
        Self {
            catalog,
            issues,
            evidence: Arc::new(evidence),
            policy,
        }
    }

    pub async fn execute(&self, records: Vec<TestRecord>, cycle: &CycleOptions) -> Result<RunSummary> {
        let partition = self.policy.partition(records);
        info!(
            groups = partition.groups.len(),
            skipped = partition.skipped,
            "Test records grouped"
        );

        let mut summary = RunSummary {
            skipped: partition.skipped,
            ..Default::default()
        };
        if partition.groups.is_empty() {
            info!("No test records reference a ticket, nothing to publish");
            return Ok(summary);
        }

        let cycle_key: Arc<str> = self
            .catalog
            .create_run_cycle(cycle.name_prefix.as_deref(), cycle.folder_id)
            .await?
            .into();
        summary.cycle_key = Some(cycle_key.to_string());

        let claims = Arc::new(TestCaseClaims::default());
        let mut handles = Vec::with_capacity(partition.groups.len());
        for group in partition.groups {
            let key = group.key.clone();
            let this = self.clone();
            let cycle_key = cycle_key.clone();
            let claims = claims.clone();
            let handle =
                tokio::spawn(async move { this.process_group(&cycle_key, &claims, group).await });
            handles.push((key, handle));
        }

        for (group, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err((
                    GroupStage::Task,
                    AppError::Internal(format!("Group task did not complete: {}", join_error)),
                )),
            };
            match outcome {
                Ok(published) => summary.published.push(published),
                Err((stage, err)) => {
                    error!(group = %group, stage = %stage, error = %err, "Group publication failed");
                    summary.failures.push(GroupFailure {
                        group,
                        stage,
                        error: err,
                    });
                }
            }
        }

        info!(
            cycle = %cycle_key,
            published = summary.published.len(),
            failed = summary.failures.len(),
            skipped = summary.skipped,
            "Run finished"
        );
        Ok(summary)
    }

    async fn process_group(
        &self,
        cycle_key: &str,
        claims: &TestCaseClaims,
        group: TestGroup,
    ) -> StageResult<PublishedGroup> {
        let issue_key = group.key.issue_key.as_str();
        info!(group = %group.key, records = group.records.len(), "Processing group");

        let title = at(
            GroupStage::ResolveIssue,
            self.issues.resolve_title(issue_key).await,
        )?;
        let placement = at(GroupStage::Placement, self.policy.placement(&group, &title))?;

        let folder_id = at(
            GroupStage::ResolveFolder,
            self.catalog
                .get_or_create_folder(&placement.folder, self.catalog.default_parent_id())
                .await,
        )?;
        info!(group = %group.key, folder = %placement.folder, folder_id, "Using folder");

        let test_case_key = at(
            GroupStage::ResolveTestCase,
            self.catalog
                .get_or_create_test_case(&placement.test_case, folder_id)
                .await,
        )?;
        at(
            GroupStage::ResolveTestCase,
            claims.claim(&test_case_key, &group.key),
        )?;
        info!(group = %group.key, test_case = %test_case_key, "Using test case");

        let steps = self.evidence.steps(&group.records);
        at(
            GroupStage::UploadSteps,
            self.catalog.overwrite_steps(&test_case_key, &steps).await,
        )?;

        let issue_ids = at(
            GroupStage::LinkIssues,
            self.issues.resolve_ids(&[group.key.issue_key.clone()]).await,
        )?;
        self.catalog.link_issue(&test_case_key, &issue_ids).await;

        let status = self.evidence.overall_status(&group.records);
        let results = self.evidence.step_results(&group.records);
        at(
            GroupStage::Publish,
            self.catalog
                .publish_execution(cycle_key, &test_case_key, status, &results)
                .await,
        )?;

        Ok(PublishedGroup {
            group: group.key,
            folder_id,
            test_case_key,
            status,
        })
    }
}
