//! Error types for navigation primitives.

use portal_adapter::PageError;
use thiserror::Error;

/// Failure modes of a single navigation primitive call.
#[derive(Debug, Error, Clone)]
pub enum NavError {
    /// Page or element did not reach the expected state in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// No control matched the expected text within the locator scope.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Masked field value verification failed after entry.
    #[error("masked input mismatch: {0}")]
    MaskedInput(String),

    /// Operation abandoned because the batch was cancelled.
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// Browser transport or portal-side error.
    #[error("page I/O error: {0}")]
    PageIo(String),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl NavError {
    /// Whether a single retry of the same step could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NavError::Timeout(_) | NavError::PageIo(_))
    }
}

impl From<PageError> for NavError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::NavTimeout(msg) => NavError::Timeout(msg),
            PageError::TargetNotFound(msg) | PageError::OptionNotFound(msg) => {
                NavError::ElementNotFound(msg)
            }
            PageError::LaunchFailed(msg) | PageError::Transport(msg) => NavError::PageIo(msg),
            PageError::Internal(msg) => NavError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_covers_transient_failures_only() {
        assert!(NavError::Timeout("t".into()).is_retryable());
        assert!(NavError::PageIo("io".into()).is_retryable());
        assert!(!NavError::ElementNotFound("e".into()).is_retryable());
        assert!(!NavError::MaskedInput("m".into()).is_retryable());
        assert!(!NavError::Interrupted("i".into()).is_retryable());
    }

    #[test]
    fn page_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            NavError::from(PageError::NavTimeout("x".into())),
            NavError::Timeout(_)
        ));
        assert!(matches!(
            NavError::from(PageError::OptionNotFound("x".into())),
            NavError::ElementNotFound(_)
        ));
        assert!(matches!(
            NavError::from(PageError::Transport("x".into())),
            NavError::PageIo(_)
        ));
    }
}
