//! In-memory stand-in for the catalog and issue tracker, used by tests.

use crate::domain::catalog::{Folder, TestCaseSummary};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::http::{ApiRequest, Transport};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RemoteState {
    next_id: u64,
    folders: Vec<Folder>,
    test_cases: Vec<TestCaseSummary>,
    created_test_cases: Vec<Value>,
    cycles: Vec<Value>,
    steps: HashMap<String, Value>,
    links: HashSet<(String, u64)>,
    executions: Vec<Value>,
    issues: HashMap<String, (u64, String)>,
    failing_folders: HashSet<String>,
    failing_cycles: bool,
    calls: Vec<(Method, String)>,
}

impl RemoteState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct FakeRemote {
    state: Mutex<RemoteState>,
    create_delay: Duration,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RemoteState {
                next_id: 100,
                ..Default::default()
            }),
            create_delay: Duration::ZERO,
        })
    }

    /// Slows down create calls so concurrent callers overlap.
    pub fn with_create_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        let state = std::mem::take(&mut *self.state.lock().unwrap());
        Arc::new(Self {
            state: Mutex::new(state),
            create_delay: delay,
        })
    }

    pub fn seed_folder(&self, name: &str, parent_id: u64) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.folders.push(Folder {
            id,
            parent_id: Some(parent_id),
            name: name.to_string(),
        });
        id
    }

    pub fn seed_test_case(&self, name: &str, folder_id: u64) -> String {
        let mut state = self.state.lock().unwrap();
        let key = format!("ED-T{}", state.next_id());
        state.test_cases.push(TestCaseSummary {
            key: key.clone(),
            name: name.to_string(),
            folder: Some(crate::domain::catalog::FolderRef { id: folder_id }),
        });
        key
    }

    pub fn seed_issue(&self, key: &str, id: u64, summary: &str) {
        self.state
            .lock()
            .unwrap()
            .issues
            .insert(key.to_string(), (id, summary.to_string()));
    }

    /// Folder creation with this name answers `400`.
    pub fn fail_folder(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_folders
            .insert(name.to_string());
    }

    /// Cycle creation answers `500`.
    pub fn fail_cycles(&self) {
        self.state.lock().unwrap().failing_cycles = true;
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.state.lock().unwrap().folders.clone()
    }

    pub fn cycles(&self) -> Vec<Value> {
        self.state.lock().unwrap().cycles.clone()
    }

    pub fn created_test_cases(&self) -> Vec<Value> {
        self.state.lock().unwrap().created_test_cases.clone()
    }

    pub fn steps(&self, key: &str) -> Option<Value> {
        self.state.lock().unwrap().steps.get(key).cloned()
    }

    pub fn links(&self) -> HashSet<(String, u64)> {
        self.state.lock().unwrap().links.clone()
    }

    pub fn executions(&self) -> Vec<Value> {
        self.state.lock().unwrap().executions.clone()
    }

    async fn pause(&self) {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }
    }

    fn query<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn body(request: &ApiRequest) -> Value {
        request.body.clone().unwrap_or(Value::Null)
    }

    fn list_folders(&self, request: &ApiRequest) -> Value {
        let start_at: usize = Self::query(request, "startAt")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let max_results: usize = Self::query(request, "maxResults")
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let state = self.state.lock().unwrap();
        let values: Vec<&Folder> = state.folders.iter().skip(start_at).take(max_results).collect();
        let is_last = start_at + values.len() >= state.folders.len();
        json!({
            "startAt": start_at,
            "maxResults": max_results,
            "total": state.folders.len(),
            "isLast": is_last,
            "values": values,
        })
    }

    fn list_test_cases(&self, request: &ApiRequest) -> Value {
        let folder_id: Option<u64> = Self::query(request, "folderId").and_then(|v| v.parse().ok());
        let state = self.state.lock().unwrap();
        let values: Vec<&TestCaseSummary> = state
            .test_cases
            .iter()
            .filter(|case| case.folder.as_ref().map(|f| f.id) == folder_id)
            .collect();
        json!({ "startAt": 0, "isLast": true, "values": values })
    }

    async fn create_folder(&self, body: Value) -> Result<Value> {
        let name = body["name"].as_str().unwrap_or_default().to_string();
        if self.state.lock().unwrap().failing_folders.contains(&name) {
            return Err(AppError::Client {
                status: 400,
                message: format!("folder '{}' rejected", name),
            });
        }
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.folders.push(Folder {
            id,
            parent_id: body["parentId"].as_u64(),
            name,
        });
        Ok(json!({ "id": id }))
    }

    async fn create_test_case(&self, body: Value) -> Result<Value> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let key = format!("ED-T{}", id);
        state.test_cases.push(TestCaseSummary {
            key: key.clone(),
            name: body["name"].as_str().unwrap_or_default().to_string(),
            folder: body["folderId"]
                .as_u64()
                .map(|id| crate::domain::catalog::FolderRef { id }),
        });
        state.created_test_cases.push(body);
        Ok(json!({ "id": id, "key": key }))
    }

    fn route(&self, request: &ApiRequest) -> Result<Value> {
        let path = request.path.as_str();
        let mut state = self.state.lock().unwrap();
        match (request.method.clone(), path.split('/').collect::<Vec<_>>().as_slice()) {
            (Method::POST, ["testcycles"]) if state.failing_cycles => Err(AppError::Server {
                status: 500,
                message: "cycle store offline".to_string(),
            }),
            (Method::POST, ["testcycles"]) => {
                let id = state.next_id();
                state.cycles.push(Self::body(request));
                Ok(json!({ "id": id, "key": format!("ED-R{}", id) }))
            }
            (Method::POST, ["testcases", key, "teststeps"]) => {
                state.steps.insert(key.to_string(), Self::body(request));
                Ok(Value::Null)
            }
            (Method::POST, ["testcases", key, "links", "issues"]) => {
                let issue_id = Self::body(request)["issueId"].as_u64().unwrap_or_default();
                if !state.links.insert((key.to_string(), issue_id)) {
                    return Err(AppError::Client {
                        status: 400,
                        message: "issue already linked".to_string(),
                    });
                }
                let id = state.next_id();
                Ok(json!({ "id": id }))
            }
            (Method::POST, ["testexecutions"]) => {
                let id = state.next_id();
                state.executions.push(Self::body(request));
                Ok(json!({ "id": id }))
            }
            (Method::GET, ["issue", key]) => match state.issues.get(*key) {
                Some((id, summary)) => Ok(json!({
                    "id": id.to_string(),
                    "key": key,
                    "fields": { "summary": summary }
                })),
                None => Err(AppError::Client {
                    status: 404,
                    message: format!("Issue {} does not exist", key),
                }),
            },
            _ => Err(AppError::Client {
                status: 404,
                message: format!("No route for {} {}", request.method, path),
            }),
        }
    }
}

#[async_trait]
impl Transport for FakeRemote {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push((request.method.clone(), request.path.clone()));
        tokio::task::yield_now().await;

        match (request.method.clone(), request.path.as_str()) {
            (Method::GET, "folders") => Ok(self.list_folders(&request)),
            (Method::POST, "folders") => self.create_folder(Self::body(&request)).await,
            (Method::GET, "testcases") => Ok(self.list_test_cases(&request)),
            (Method::POST, "testcases") => self.create_test_case(Self::body(&request)).await,
            _ => self.route(&request),
        }
    }
}
