use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentCoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AgentCore returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("could not decode AgentCore response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AgentCoreError {
    /// Throttling and 5xx responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, code, .. } => {
                *status == 429 || *status >= 500 || matches!(code.as_str(), "ThrottledException" | "ThrottlingException")
            }
            _ => false,
        }
    }
}

pub type AgentCoreResult<T> = Result<T, AgentCoreError>;
