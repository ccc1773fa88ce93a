use std::time::Duration;

use mcp_common::openai::OpenAiClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("model error: {0}")]
    Model(#[from] OpenAiClientError),

    #[error("model call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AppError {
    /// Either the turn timeout or the client's own request timeout fired.
    pub fn is_timeout(&self) -> bool {
        match self {
            AppError::Timeout(_) => true,
            AppError::Model(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        assert!(AppError::Timeout(Duration::from_millis(300)).is_timeout());
        assert!(!AppError::Model(OpenAiClientError::EmptyCompletion).is_timeout());
        assert!(!AppError::Catalog("down".to_string()).is_timeout());
        assert_eq!(
            AppError::Timeout(Duration::from_secs(25)).to_string(),
            "model call timed out after 25s"
        );
    }
}
