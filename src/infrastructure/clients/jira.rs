use crate::domain::error::{AppError, Result};
use crate::domain::issue::{Issue, IssuePayload};
use crate::infrastructure::http::{ApiRequest, Transport};
use crate::shared::coalesce::Coalescer;
use std::sync::Arc;
use tracing::debug;

/// Ticket lookups, one remote call per key for the whole run.
pub struct JiraIssueResolver {
    transport: Arc<dyn Transport>,
    issues: Coalescer<String, Issue>,
}

impl JiraIssueResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            issues: Coalescer::new(),
        }
    }

    pub async fn resolve(&self, issue_key: &str) -> Result<Issue> {
        let key = issue_key.trim();
        if key.is_empty() {
            return Err(AppError::Internal("Issue key is required".to_string()));
        }
        self.issues
            .resolve(key.to_string(), move || async move { self.fetch(key).await })
            .await
    }

    pub async fn resolve_title(&self, issue_key: &str) -> Result<String> {
        Ok(self.resolve(issue_key).await?.summary)
    }

    pub async fn resolve_ids(&self, issue_keys: &[String]) -> Result<Vec<u64>> {
        let mut ids = Vec::with_capacity(issue_keys.len());
        for key in issue_keys {
            ids.push(self.resolve(key).await?.id);
        }
        Ok(ids)
    }

    async fn fetch(&self, key: &str) -> Result<Issue> {
        let value = self
            .transport
            .send(ApiRequest::get(format!("issue/{}", key)))
            .await?;
        let payload: IssuePayload = serde_json::from_value(value)
            .map_err(|e| AppError::Protocol(format!("Unexpected issue payload for {}: {}", key, e)))?;
        let id = payload.id.parse::<u64>().map_err(|_| {
            AppError::Protocol(format!("Issue {} has a non-numeric id '{}'", key, payload.id))
        })?;
        debug!(issue = %payload.key, id, "Issue resolved");
        Ok(Issue {
            id,
            key: payload.key,
            summary: payload.fields.summary,
        })
    }
}
