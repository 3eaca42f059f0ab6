use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(String),
    TransientNetwork(String),
    RateLimited {
        retry_after: Option<u64>,
        message: String,
    },
    Auth(String),
    Client {
        status: u16,
        message: String,
    },
    Server {
        status: u16,
        message: String,
    },
    Protocol(String),
    RetriesExhausted {
        method: String,
        url: String,
        body: Option<String>,
        attempts: u32,
        last_error: Box<AppError>,
    },
    DuplicateFolder {
        parent_id: u64,
        name: String,
        count: usize,
    },
    DuplicateTestCase {
        folder_id: u64,
        name: String,
        count: usize,
    },
    LinkConflict {
        test_case_key: String,
        issue_id: u64,
    },
    TestCaseClaimed {
        test_case_key: String,
        owner: String,
    },
    InvalidRecord(String),
    Io(String),
    Internal(String),
}

impl AppError {
    /// Outcomes the transport retries: rate limiting, stale credentials at the
    /// edge (401), service unavailable (503) and connection-level failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::TransientNetwork(_) | AppError::RateLimited { .. } | AppError::Auth(_) => {
                true
            }
            AppError::Server { status, .. } => *status == 503,
            _ => false,
        }
    }

    /// Status code carried by an HTTP-level failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::RateLimited { .. } => Some(429),
            AppError::Auth(_) => Some(401),
            AppError::Client { status, .. } | AppError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::TransientNetwork(msg) => write!(f, "Network error: {}", msg),
            AppError::RateLimited {
                retry_after,
                message,
            } => match retry_after {
                Some(secs) => write!(f, "Rate limited (retry after {}s): {}", secs, message),
                None => write!(f, "Rate limited: {}", message),
            },
            AppError::Auth(msg) => write!(f, "Authentication rejected (401): {}", msg),
            AppError::Client { status, message } => {
                write!(f, "Client error ({}): {}", status, message)
            }
            AppError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            AppError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            AppError::RetriesExhausted {
                method,
                url,
                body,
                attempts,
                last_error,
            } => write!(
                f,
                "Retries exhausted after {} attempts: {} {} body={} last error: {}",
                attempts,
                method,
                url,
                body.as_deref().unwrap_or("<none>"),
                last_error
            ),
            AppError::DuplicateFolder {
                parent_id,
                name,
                count,
            } => write!(
                f,
                "Found {} folders named '{}' under parent {}",
                count, name, parent_id
            ),
            AppError::DuplicateTestCase {
                folder_id,
                name,
                count,
            } => write!(
                f,
                "In folder {} were found {} test cases with the same name '{}'",
                folder_id, count, name
            ),
            AppError::LinkConflict {
                test_case_key,
                issue_id,
            } => write!(
                f,
                "Test case {} is already linked to issue {}",
                test_case_key, issue_id
            ),
            AppError::TestCaseClaimed {
                test_case_key,
                owner,
            } => write!(
                f,
                "Test case {} is already published in this cycle by group {}",
                test_case_key, owner
            ),
            AppError::InvalidRecord(msg) => write!(f, "Invalid test record: {}", msg),
            AppError::Io(msg) => write!(f, "IO error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_allow_list() {
        assert!(AppError::Auth("stale".to_string()).is_retryable());
        assert!(AppError::RateLimited {
            retry_after: Some(5),
            message: String::new()
        }
        .is_retryable());
        assert!(AppError::Server {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!AppError::Server {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(!AppError::Client {
            status: 404,
            message: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_retries_exhausted_mentions_auth() {
        let err = AppError::RetriesExhausted {
            method: "GET".to_string(),
            url: "https://example.test/v2/folders".to_string(),
            body: None,
            attempts: 3,
            last_error: Box::new(AppError::Auth("token expired".to_string())),
        };
        let text = err.to_string();
        assert!(text.contains("GET https://example.test/v2/folders"));
        assert!(text.contains("Authentication rejected (401)"));
    }
}
