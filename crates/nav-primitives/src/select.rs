//! Dropdown selection by visible option text.

use std::time::Duration;

use portal_adapter::PortalPage;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::errors::NavError;
use crate::types::{StepCtx, POLL_INTERVAL};

/// Select the option whose visible text equals `label`.
///
/// Polls while the select or its options have not rendered yet (the portal
/// populates the code dropdown after the menu navigation completes); gives up
/// with `NavError::ElementNotFound` at the deadline.
pub async fn select_option_by_label(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    locator: &str,
    label: &str,
    timeout: Duration,
) -> Result<(), NavError> {
    if ctx.is_cancelled() {
        return Err(NavError::Interrupted(format!(
            "cancelled before selecting '{label}'"
        )));
    }

    let deadline = Instant::now() + timeout;

    info!(
        step_id = %ctx.step_id,
        tag = %ctx.tag,
        locator,
        label,
        "selecting option by label"
    );

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match page.select_by_label(locator, label, remaining).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_transient() => {
                if Instant::now() >= deadline {
                    return Err(NavError::ElementNotFound(format!(
                        "option '{}' not selectable in '{}' within {}ms: {}",
                        label,
                        locator,
                        timeout.as_millis(),
                        err
                    )));
                }
                debug!(locator, label, "option not available yet, polling");
                sleep(POLL_INTERVAL).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
