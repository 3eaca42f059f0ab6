pub mod jira;
pub mod zephyr_scale;

#[cfg(test)]
pub mod fake_remote;

use crate::domain::error::{AppError, Result};
use crate::domain::publisher_config::PublisherConfig;
use crate::infrastructure::http::transport::default_headers;
use crate::infrastructure::http::{HttpTransport, RetryPolicy};
use base64::Engine as _;
use std::time::Duration;
use url::Url;

pub use jira::JiraIssueResolver;
pub use zephyr_scale::ScaleCatalogClient;

const CATALOG_API_PATH: &str = "v2/";
const TRACKER_API_PATH: &str = "rest/api/2/";

/// `https://{domain}/{api_path}`; a domain that already names a scheme is kept as is.
pub fn api_base(domain: &str, api_path: &str) -> Result<Url> {
    let domain = domain.trim().trim_end_matches('/');
    let root = if domain.starts_with("http://") || domain.starts_with("https://") {
        format!("{}/", domain)
    } else {
        format!("https://{}/", domain)
    };
    Url::parse(&root)
        .and_then(|url| url.join(api_path))
        .map_err(|e| AppError::Config(format!("Invalid domain '{}': {}", domain, e)))
}

fn retry_policy(config: &PublisherConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.max_retry,
        fallback_delay: Duration::from_secs(config.retry_fallback_secs),
    }
}

pub fn catalog_transport(config: &PublisherConfig) -> Result<HttpTransport> {
    HttpTransport::new(
        api_base(&config.zephyr.domain, CATALOG_API_PATH)?,
        default_headers(&format!("Bearer {}", config.zephyr.token))?,
        Duration::from_secs(config.http_timeout_secs),
        retry_policy(config),
    )
}

pub fn tracker_transport(config: &PublisherConfig) -> Result<HttpTransport> {
    let credential = match config.jira.email.as_deref() {
        Some(email) if !email.trim().is_empty() => base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", email.trim(), config.jira.token)),
        _ => config.jira.token.clone(),
    };
    HttpTransport::new(
        api_base(&config.jira.domain, TRACKER_API_PATH)?,
        default_headers(&format!("Basic {}", credential))?,
        Duration::from_secs(config.http_timeout_secs),
        retry_policy(config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_defaults_to_https() {
        assert_eq!(
            api_base("api.catalog.test", CATALOG_API_PATH).unwrap().as_str(),
            "https://api.catalog.test/v2/"
        );
        assert_eq!(
            api_base("http://127.0.0.1:8080/", TRACKER_API_PATH)
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8080/rest/api/2/"
        );
    }

    #[test]
    fn test_api_base_rejects_garbage() {
        assert!(matches!(
            api_base("http://exa mple", CATALOG_API_PATH),
            Err(AppError::Config(_))
        ));
    }
}
