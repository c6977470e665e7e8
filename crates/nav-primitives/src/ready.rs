//! Page readiness waiting.

use std::time::Duration;

use portal_adapter::PortalPage;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::errors::NavError;
use crate::types::{StepCtx, POLL_INTERVAL};

/// Wait until the document is interactive, then let late-rendering content
/// settle and confirm readiness once more.
///
/// The portal fires its load event before JSF finishes rendering dynamic
/// panels, so a bare readyState check advances too early; the settle interval
/// absorbs that gap. Fails with `NavError::Timeout` once `timeout` elapses.
pub async fn wait_for_page_ready(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    timeout: Duration,
    settle: Duration,
) -> Result<(), NavError> {
    // Cancellation is honored between primitive calls, never mid-flight: a
    // wait that has started runs to readiness or its own timeout.
    if ctx.is_cancelled() {
        return Err(NavError::Interrupted(
            "cancelled before waiting for page ready".to_string(),
        ));
    }

    let deadline = Instant::now() + timeout;

    info!(
        step_id = %ctx.step_id,
        tag = %ctx.tag,
        timeout_ms = timeout.as_millis() as u64,
        "waiting for page ready"
    );

    wait_until_interactive(page, deadline, timeout).await?;

    if !settle.is_zero() {
        debug!(settle_ms = settle.as_millis() as u64, "settling");
        sleep(settle).await;
        wait_until_interactive(page, deadline, timeout).await?;
    }

    Ok(())
}

async fn wait_until_interactive(
    page: &dyn PortalPage,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), NavError> {
    loop {
        let state = page.ready_state().await?;
        if state == "interactive" || state == "complete" {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(NavError::Timeout(format!(
                "page not ready after {}ms (readyState={})",
                timeout.as_millis(),
                state
            )));
        }

        sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_adapter::fake::FakePage;

    #[tokio::test]
    async fn returns_immediately_on_ready_page() {
        let page = FakePage::new();
        let ctx = StepCtx::detached("t");

        wait_for_page_ready(&page, &ctx, Duration::from_secs(5), Duration::ZERO)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_on_a_page_stuck_loading() {
        let page = FakePage::new();
        page.set_ready_state("loading");
        let ctx = StepCtx::detached("t");

        let err = wait_for_page_ready(&page, &ctx, Duration::from_secs(2), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, NavError::Timeout(_)));
    }

    #[tokio::test]
    async fn pre_cancelled_context_never_starts_the_wait() {
        let page = FakePage::new();
        page.set_ready_state("loading");
        let ctx = StepCtx::detached("t");
        ctx.cancel.cancel();

        let err = wait_for_page_ready(&page, &ctx, Duration::from_secs(2), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, NavError::Interrupted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_interval_reconfirms_readiness() {
        let page = FakePage::new();
        let ctx = StepCtx::detached("t");

        wait_for_page_ready(
            &page,
            &ctx,
            Duration::from_secs(5),
            Duration::from_millis(750),
        )
        .await
        .unwrap();
    }
}
