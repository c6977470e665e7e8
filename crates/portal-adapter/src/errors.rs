//! Error types for portal page operations.

use thiserror::Error;

pub type PageResult<T> = Result<T, PageError>;

/// Errors surfaced by a [`crate::PortalPage`] implementation.
#[derive(Debug, Error, Clone)]
pub enum PageError {
    /// Navigation did not complete within its deadline.
    #[error("navigation timeout: {0}")]
    NavTimeout(String),

    /// The locator matched no element on the page.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// A dropdown had no option with the requested label.
    #[error("option not found: {0}")]
    OptionNotFound(String),

    /// Browser process could not be launched.
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    /// CDP transport or protocol error.
    #[error("page I/O error: {0}")]
    Transport(String),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PageError {
    /// Transient errors that may clear on a later poll of the same operation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PageError::TargetNotFound(_) | PageError::OptionNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(PageError::TargetNotFound("x".into()).is_transient());
        assert!(PageError::OptionNotFound("x".into()).is_transient());
        assert!(!PageError::Transport("x".into()).is_transient());
        assert!(!PageError::LaunchFailed("x".into()).is_transient());
    }
}
