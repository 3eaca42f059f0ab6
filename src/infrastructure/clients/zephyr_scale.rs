use crate::domain::catalog::{
    CreatedEntity, ExecutionStatus, Folder, IssueLinkRequest, NewFolder, NewTestCase,
    NewTestCycle, NewTestExecution, Page, StepResult, StepUpdate, TestCaseSummary, TestStep,
};
use crate::domain::error::{AppError, Result};
use crate::domain::publisher_config::{CatalogSettings, RunContext};
use crate::infrastructure::http::{ApiRequest, Transport};
use crate::shared::coalesce::Coalescer;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const FOLDER_PAGE_SIZE: u64 = 200;
/// Largest page the catalog serves; one call lists a whole folder.
pub const TEST_CASE_PAGE_SIZE: u64 = 4000;

const FOLDER_TYPE: &str = "TEST_CASE";
const NEW_TEST_CASE_STATUS: &str = "Approved";

/// Catalog cycle name: `{prefix}Run: {run} / Branch: {branch} (Mon Jan 01 2024)`.
pub fn cycle_name(prefix: &str, run: &RunContext, date: NaiveDate) -> String {
    format!(
        "{}Run: {} / Branch: {} ({})",
        prefix,
        run.run_id,
        run.branch_name,
        date.format("%a %b %d %Y")
    )
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Protocol(format!("Unexpected {} payload: {}", what, e)))
}

/// Typed catalog operations for one run.
///
/// Folder and test-case resolution is lookup-then-create. The folder listing is
/// fetched once (all pages) and dropped whenever a folder is created; test-case
/// listings are fetched per folder. Concurrent resolutions of the same
/// `(name, parent)` pair share a single lookup and at most one create call.
pub struct ScaleCatalogClient {
    transport: Arc<dyn Transport>,
    project_key: String,
    parent_id: u64,
    owner_id: Option<String>,
    cycle_folder: Option<u64>,
    run: RunContext,
    folders: Mutex<Option<Arc<Vec<Folder>>>>,
    folder_ids: Coalescer<(u64, String), u64>,
    test_case_keys: Coalescer<(u64, String), String>,
}

impl ScaleCatalogClient {
    pub fn new(transport: Arc<dyn Transport>, settings: &CatalogSettings, run: RunContext) -> Self {
        Self {
            transport,
            project_key: settings.project_key.clone(),
            parent_id: settings.folder_parent_id,
            owner_id: settings.owner_id.clone(),
            cycle_folder: settings.test_cycle_folder,
            run,
            folders: Mutex::new(None),
            folder_ids: Coalescer::new(),
            test_case_keys: Coalescer::new(),
        }
    }

    pub fn default_parent_id(&self) -> u64 {
        self.parent_id
    }

    /// Creates a new cycle on every call.
    pub async fn create_run_cycle(
        &self,
        name_prefix: Option<&str>,
        folder_id: Option<u64>,
    ) -> Result<String> {
        let today = chrono::Local::now().date_naive();
        let name = cycle_name(name_prefix.unwrap_or(""), &self.run, today);
        let body = NewTestCycle {
            project_key: &self.project_key,
            name: &name,
            folder_id: folder_id.or(self.cycle_folder),
        };
        let created: CreatedEntity =
            decode(self.transport.send(ApiRequest::post("testcycles", &body)?).await?, "test cycle")?;
        let key = created
            .key
            .ok_or_else(|| AppError::Protocol("Test cycle response has no key".to_string()))?;
        info!(cycle = %key, name = %name, "Test cycle created");
        Ok(key)
    }

    pub async fn get_or_create_folder(&self, name: &str, parent_id: u64) -> Result<u64> {
        self.folder_ids
            .resolve((parent_id, name.to_string()), move || async move {
                let listing = self.folder_listing().await?;
                let matches: Vec<&Folder> = listing
                    .iter()
                    .filter(|folder| folder.parent_id == Some(parent_id) && folder.name == name)
                    .collect();
                match matches.as_slice() {
                    [] => {
                        let id = self.create_folder(name, parent_id).await?;
                        self.invalidate_folders().await;
                        Ok(id)
                    }
                    [folder] => Ok(folder.id),
                    _ => Err(AppError::DuplicateFolder {
                        parent_id,
                        name: name.to_string(),
                        count: matches.len(),
                    }),
                }
            })
            .await
    }

    pub async fn get_or_create_test_case(&self, name: &str, folder_id: u64) -> Result<String> {
        self.test_case_keys
            .resolve((folder_id, name.to_string()), move || async move {
                let cases = self.list_test_cases(folder_id).await?;
                let matches: Vec<&TestCaseSummary> = cases
                    .iter()
                    .filter(|case| case.name == name)
                    .filter(|case| case.folder.as_ref().map_or(true, |f| f.id == folder_id))
                    .collect();
                match matches.as_slice() {
                    [] => self.create_test_case(name, folder_id).await,
                    [case] => Ok(case.key.clone()),
                    _ => Err(AppError::DuplicateTestCase {
                        folder_id,
                        name: name.to_string(),
                        count: matches.len(),
                    }),
                }
            })
            .await
    }

    /// Replaces the whole step list of a test case.
    pub async fn overwrite_steps(&self, test_case_key: &str, steps: &[TestStep]) -> Result<()> {
        let body = StepUpdate {
            mode: "OVERWRITE",
            items: steps,
        };
        self.transport
            .send(ApiRequest::post(
                format!("testcases/{}/teststeps", test_case_key),
                &body,
            )?)
            .await?;
        debug!(test_case = %test_case_key, steps = steps.len(), "Test steps replaced");
        Ok(())
    }

    /// Links every id; existing links count as success and other failures are
    /// logged per id without stopping the remaining links.
    pub async fn link_issue(&self, test_case_key: &str, issue_ids: &[u64]) {
        for &issue_id in issue_ids {
            let path = format!("testcases/{}/links/issues", test_case_key);
            let request = match ApiRequest::post(path, &IssueLinkRequest { issue_id }) {
                Ok(request) => request,
                Err(err) => {
                    warn!(test_case = %test_case_key, issue_id, error = %err, "Issue link skipped");
                    continue;
                }
            };
            match self.transport.send(request).await {
                Ok(_) => info!(test_case = %test_case_key, issue_id, "Issue linked"),
                Err(AppError::Client { status: 400 | 409, .. }) => {
                    let conflict = AppError::LinkConflict {
                        test_case_key: test_case_key.to_string(),
                        issue_id,
                    };
                    info!(%conflict, "Issue link already present");
                }
                Err(err) => {
                    warn!(test_case = %test_case_key, issue_id, error = %err, "Issue link failed")
                }
            }
        }
    }

    /// Not idempotent: every call records another execution in the cycle.
    pub async fn publish_execution(
        &self,
        cycle_key: &str,
        test_case_key: &str,
        status: ExecutionStatus,
        step_results: &[StepResult],
    ) -> Result<()> {
        let body = NewTestExecution {
            project_key: &self.project_key,
            test_cycle_key: cycle_key,
            test_case_key,
            status_name: status,
            test_script_results: step_results,
        };
        self.transport
            .send(ApiRequest::post("testexecutions", &body)?)
            .await?;
        info!(cycle = %cycle_key, test_case = %test_case_key, status = %status, "Execution published");
        Ok(())
    }

    /// Callers block behind an in-flight load instead of starting another.
    async fn folder_listing(&self) -> Result<Arc<Vec<Folder>>> {
        let mut cached = self.folders.lock().await;
        if let Some(listing) = cached.as_ref() {
            return Ok(listing.clone());
        }
        let listing = Arc::new(self.fetch_all_folders().await?);
        *cached = Some(listing.clone());
        Ok(listing)
    }

    async fn invalidate_folders(&self) {
        *self.folders.lock().await = None;
    }

    async fn fetch_all_folders(&self) -> Result<Vec<Folder>> {
        let mut folders = Vec::new();
        let mut start_at = 0u64;
        loop {
            let request = ApiRequest::get("folders")
                .query("projectKey", &self.project_key)
                .query("folderType", FOLDER_TYPE)
                .query("startAt", start_at)
                .query("maxResults", FOLDER_PAGE_SIZE);
            let page: Page<Folder> = decode(self.transport.send(request).await?, "folder listing")?;
            let fetched = page.values.len() as u64;
            folders.extend(page.values);

            let last = match page.is_last {
                Some(last) => last,
                None => page.total.map_or(true, |total| folders.len() as u64 >= total),
            };
            if last || fetched == 0 {
                break;
            }
            start_at += fetched;
        }
        debug!(project = %self.project_key, folders = folders.len(), "Folder listing loaded");
        Ok(folders)
    }

    async fn list_test_cases(&self, folder_id: u64) -> Result<Vec<TestCaseSummary>> {
        let request = ApiRequest::get("testcases")
            .query("projectKey", &self.project_key)
            .query("folderId", folder_id)
            .query("maxResults", TEST_CASE_PAGE_SIZE);
        let page: Page<TestCaseSummary> =
            decode(self.transport.send(request).await?, "test case listing")?;
        if page.is_last == Some(false) {
            warn!(
                folder_id,
                listed = page.values.len(),
                total = page.total.unwrap_or_default(),
                "Test case listing truncated"
            );
        }
        Ok(page.values)
    }

    async fn create_folder(&self, name: &str, parent_id: u64) -> Result<u64> {
        let body = NewFolder {
            name,
            parent_id,
            project_key: &self.project_key,
            folder_type: FOLDER_TYPE,
        };
        let created: CreatedEntity =
            decode(self.transport.send(ApiRequest::post("folders", &body)?).await?, "folder")?;
        let id = created
            .id
            .ok_or_else(|| AppError::Protocol("Folder response has no id".to_string()))?;
        info!(folder = %name, parent_id, id, "Folder created");
        Ok(id)
    }

    async fn create_test_case(&self, name: &str, folder_id: u64) -> Result<String> {
        let body = NewTestCase {
            project_key: &self.project_key,
            name,
            folder_id,
            status_name: NEW_TEST_CASE_STATUS,
            owner_id: self.owner_id.as_deref(),
        };
        let created: CreatedEntity =
            decode(self.transport.send(ApiRequest::post("testcases", &body)?).await?, "test case")?;
        let key = created
            .key
            .ok_or_else(|| AppError::Protocol("Test case response has no key".to_string()))?;
        info!(test_case = %key, name = %name, folder_id, "Test case created");
        Ok(key)
    }
}
