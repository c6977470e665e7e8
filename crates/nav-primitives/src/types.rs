//! Execution context carried through every primitive call.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Poll cadence for element and readiness waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Context for one state-machine step: cooperative cancellation, the record
/// being processed (for tracing), and a unique step id for log correlation.
#[derive(Clone)]
pub struct StepCtx {
    pub cancel: CancellationToken,
    pub tag: String,
    pub step_id: String,
}

impl StepCtx {
    pub fn new(cancel: CancellationToken, tag: impl Into<String>) -> Self {
        Self {
            cancel,
            tag: tag.into(),
            step_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Context with a fresh, never-cancelled token.
    pub fn detached(tag: impl Into<String>) -> Self {
        Self::new(CancellationToken::new(), tag)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_context_is_never_cancelled() {
        let ctx = StepCtx::detached("190000001");
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.tag, "190000001");
    }

    #[test]
    fn cancellation_propagates_from_the_shared_token() {
        let token = CancellationToken::new();
        let ctx = StepCtx::new(token.clone(), "190000001");
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
