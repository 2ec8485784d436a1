use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid stored credentials: {0}")]
    InvalidCredentials(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Unknown camera: {0}")]
    UnknownCamera(String),

    #[error("Camera '{0}' has no image available yet")]
    NoImage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ServiceError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ServiceError::Unauthorized,
            403 => ServiceError::AccessDenied(truncated),
            404 => ServiceError::NotFound(truncated),
            429 => ServiceError::RateLimited,
            500..=599 => ServiceError::ServerError(truncated),
            _ => ServiceError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

/// Failures of the login flow. All of them end the run.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("2FA verification failed")]
    SecondFactorRejected,

    #[error("Login failed: {0}")]
    LoginFailed(#[source] ServiceError),

    #[error("Failed to submit 2FA code: {0}")]
    SecondFactorFailed(#[source] ServiceError),

    #[error("Failed to read input: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("Failed to persist credentials: {0:#}")]
    Persist(anyhow::Error),
}
