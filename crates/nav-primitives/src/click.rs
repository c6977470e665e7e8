//! Text-disambiguated clicking.
//!
//! The portal reuses one CSS class (`span.ui-button-text`) across most of its
//! buttons; selector uniqueness cannot be assumed. These primitives enumerate
//! every element in a scope and pick the one whose rendered text matches.

use std::time::Duration;

use portal_adapter::PortalPage;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::errors::NavError;
use crate::types::{StepCtx, POLL_INTERVAL};

/// Click the first element in `scope` whose rendered text matches `expected`.
///
/// Case-sensitive exact match wins; a starts-with match is the fallback for
/// labels the portal pads with counters or icons. The winner must also be
/// visible and enabled before the click fires. Fails with
/// `NavError::ElementNotFound` when nothing matches within `timeout`.
pub async fn click_by_visible_text(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    scope: &str,
    expected: &str,
    timeout: Duration,
) -> Result<(), NavError> {
    if ctx.is_cancelled() {
        return Err(NavError::Interrupted(format!(
            "cancelled before clicking '{expected}'"
        )));
    }

    let deadline = Instant::now() + timeout;

    info!(
        step_id = %ctx.step_id,
        tag = %ctx.tag,
        scope,
        expected,
        "clicking by visible text"
    );

    let mut last_seen: Vec<String> = Vec::new();

    loop {
        let texts = page.visible_texts(scope).await?;

        if let Some(index) = best_match(&texts, expected) {
            match page.is_interactable(scope, index).await {
                Ok(true) => {
                    debug!(index, "match is interactable, clicking");
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    page.click_nth(scope, index, remaining).await?;
                    return Ok(());
                }
                // Not clickable yet, or the DOM shifted under us: keep polling.
                Ok(false) => {}
                Err(err) if err.is_transient() => {}
                Err(err) => return Err(err.into()),
            }
        }

        last_seen = texts;

        if Instant::now() >= deadline {
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    Err(element_not_found(scope, expected, &last_seen))
}

/// Anchor-specialized variant for menu entries: same matching contract,
/// applied to a scope that selects link elements.
pub async fn click_link_by_text(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    scope: &str,
    expected: &str,
    timeout: Duration,
) -> Result<(), NavError> {
    click_by_visible_text(page, ctx, scope, expected, timeout).await
}

/// Index of the best candidate: exact match first, then starts-with.
fn best_match(texts: &[String], expected: &str) -> Option<usize> {
    if let Some(index) = texts.iter().position(|t| t.trim() == expected) {
        return Some(index);
    }
    texts.iter().position(|t| t.trim().starts_with(expected))
}

fn element_not_found(scope: &str, expected: &str, last_seen: &[String]) -> NavError {
    if last_seen.is_empty() {
        return NavError::ElementNotFound(format!("no elements matched scope '{scope}'"));
    }
    let mut seen = last_seen
        .iter()
        .take(8)
        .map(|t| format!("'{}'", t.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    if last_seen.len() > 8 {
        seen.push_str(", ...");
    }
    NavError::ElementNotFound(format!(
        "no element with text '{expected}' in scope '{scope}' (saw: {seen})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_adapter::fake::FakePage;

    const BUTTONS: &str = "span.ui-button-text";

    #[test]
    fn exact_match_beats_prefix_match() {
        let texts = vec![
            "Avançar para revisão".to_string(),
            "Avançar".to_string(),
            "Voltar".to_string(),
        ];
        assert_eq!(best_match(&texts, "Avançar"), Some(1));
        assert_eq!(best_match(&texts, "Voltar"), Some(2));
        assert_eq!(best_match(&texts, "Calcular"), None);
    }

    #[test]
    fn prefix_match_is_the_fallback() {
        let texts = vec!["Calcular Imposto (2)".to_string()];
        assert_eq!(best_match(&texts, "Calcular Imposto"), Some(0));
    }

    #[tokio::test]
    async fn clicks_the_matching_button() {
        let page = FakePage::new();
        page.set_texts(BUTTONS, &["Voltar", "Avançar", "Cancelar"]);
        let ctx = StepCtx::detached("t");

        click_by_visible_text(&page, &ctx, BUTTONS, "Avançar", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(page.clicks(), vec![(BUTTONS.to_string(), 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_scope_fails_with_element_not_found() {
        let page = FakePage::new();
        let ctx = StepCtx::detached("t");
        let started = Instant::now();

        let err = click_by_visible_text(&page, &ctx, BUTTONS, "Avançar", Duration::from_secs(3))
            .await
            .unwrap_err();

        match err {
            NavError::ElementNotFound(msg) => assert!(msg.contains(BUTTONS)),
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
        // Fails at the deadline, not noticeably after it.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
        assert!(page.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_label_reports_what_was_seen() {
        let page = FakePage::new();
        page.set_texts(BUTTONS, &["Voltar", "Cancelar"]);
        let ctx = StepCtx::detached("t");

        let err = click_by_visible_text(&page, &ctx, BUTTONS, "Avançar", Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            NavError::ElementNotFound(msg) => {
                assert!(msg.contains("'Voltar'"));
                assert!(msg.contains("'Cancelar'"));
            }
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn link_variant_shares_the_matching_contract() {
        let page = FakePage::new();
        page.set_texts("a.portalPanelLink", &["IPVA", "ICMS", "ITCMD"]);
        let ctx = StepCtx::detached("t");

        click_link_by_text(&page, &ctx, "a.portalPanelLink", "ICMS", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(page.clicks(), vec![("a.portalPanelLink".to_string(), 1)]);
    }
}
