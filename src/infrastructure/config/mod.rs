use crate::domain::error::{AppError, Result};
use crate::domain::publisher_config::PublisherConfig;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use validator::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "scale-publisher.toml";

const TOP_LEVEL_ENV: [&str; 6] = [
    "MAX_RETRY",
    "RUN_ID",
    "BRANCH_NAME",
    "SERENITY_REPORT_DOMAIN",
    "HTTP_TIMEOUT_SECS",
    "RETRY_FALLBACK_SECS",
];

pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// TOML file first, then `ZEPHYR_*`, `JIRA_*` and the run variables on top.
    pub fn figment(&self) -> Figment {
        Figment::new()
            .merge(Toml::file(&self.path))
            .merge(Env::prefixed("ZEPHYR_").map(|key| format!("zephyr.{}", key).into()))
            .merge(Env::prefixed("JIRA_").map(|key| format!("jira.{}", key).into()))
            .merge(Env::raw().only(&TOP_LEVEL_ENV))
    }

    /// Loads `.env` if present, then extracts and validates the configuration.
    pub fn load(&self) -> Result<PublisherConfig> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(AppError::Config(format!("Failed to read .env: {}", err))),
        }
        let config = Self::extract(self.figment())?;
        info!(
            config_file = %self.path.display(),
            project = %config.zephyr.project_key,
            max_retry = config.max_retry,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn extract(figment: Figment) -> Result<PublisherConfig> {
        let config: PublisherConfig = figment
            .extract()
            .map_err(|e| AppError::Config(format!("Missing or invalid setting: {}", e)))?;
        config
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid settings: {}", e)))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;
    use serde_json::json;

    fn complete() -> serde_json::Value {
        json!({
            "zephyr": {
                "domain": "api.catalog.test",
                "token": "secret",
                "project_key": "ED",
                "folder_parent_id": 10,
                "test_cycle_folder": 20
            },
            "jira": { "domain": "tracker.test", "token": "basic" },
            "max_retry": 5
        })
    }

    #[test]
    fn test_extract_complete_config() {
        let config = ConfigService::extract(Figment::from(Serialized::defaults(complete()))).unwrap();
        assert_eq!(config.zephyr.project_key, "ED");
        assert_eq!(config.zephyr.test_cycle_folder, Some(20));
        assert_eq!(config.max_retry, 5);
    }

    #[test]
    fn test_missing_required_setting_is_config_error() {
        let mut value = complete();
        value["zephyr"].as_object_mut().unwrap().remove("token");
        let err = ConfigService::extract(Figment::from(Serialized::defaults(value))).unwrap_err();
        match err {
            AppError::Config(message) => assert!(message.contains("token")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_retry_bound_is_config_error() {
        let mut value = complete();
        value["max_retry"] = json!(0);
        let err = ConfigService::extract(Figment::from(Serialized::defaults(value))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_toml_statuses_table() {
        let toml = r#"
            max_retry = 2

            [zephyr]
            domain = "api.catalog.test"
            token = "secret"
            project_key = "ED"
            folder_parent_id = 10

            [jira]
            domain = "tracker.test"
            token = "basic"

            [statuses]
            timedOut = "blocked"
        "#;
        let config = ConfigService::extract(Figment::from(Toml::string(toml))).unwrap();
        assert_eq!(config.max_retry, 2);
        assert_eq!(
            config.statuses.get("timedOut"),
            Some(&crate::domain::catalog::ExecutionStatus::Blocked)
        );
    }
}
