//! Error taxonomy for the consistency engine
//!
//! None of these escape a scan as a hard failure: syntax errors become a
//! Critical issue, fix failures demote a single issue, subscriber and cycle
//! failures are logged. Only configuration errors reach the caller.

use thiserror::Error;

use crate::models::IssueCategory;

/// Errors that can occur in the consistency engine
#[derive(Error, Debug)]
pub enum ConsistencyError {
    #[error("Syntax error in {path} at line {line}: {message}")]
    SourceSyntax {
        path: String,
        line: u32,
        message: String,
    },

    #[error("Failed to apply {category} fix: {reason}")]
    FixApplication {
        category: IssueCategory,
        reason: String,
    },

    #[error("Alert subscriber failed: {message}")]
    SubscriberCallback { message: String },

    #[error("Monitoring cycle failed: {message}")]
    TransientScan { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsistencyError {
    pub fn config(message: impl Into<String>) -> Self {
        ConsistencyError::Config {
            message: message.into(),
        }
    }
}

pub type ConsistencyResult<T> = Result<T, ConsistencyError>;

/// Render a panic payload caught with `catch_unwind`
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
