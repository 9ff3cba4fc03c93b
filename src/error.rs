use thiserror::Error;

use crate::marks::Rejection;

#[derive(Error, Debug)]
pub enum CutError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("command rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CutError {
    pub fn validation(message: impl Into<String>) -> Self {
        CutError::Validation(message.into())
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        CutError::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CutError>;
