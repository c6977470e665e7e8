//! Field entry, masked and plain.

use std::time::Duration;

use chrono::NaiveDate;
use portal_adapter::PortalPage;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::errors::NavError;
use crate::types::{StepCtx, POLL_INTERVAL};

/// Date format the portal's calendar inputs display.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Clear a field and type `text` into it one keystroke at a time.
///
/// Used for fields whose mask reformats the entry (IE punctuation, currency
/// grouping), so no strict read-back is performed; the mask engine owns the
/// final presentation.
pub async fn fill_field(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    locator: &str,
    text: &str,
    timeout: Duration,
    key_delay: Duration,
) -> Result<(), NavError> {
    info!(
        step_id = %ctx.step_id,
        tag = %ctx.tag,
        locator,
        "filling field"
    );
    enter_value(page, ctx, locator, text, timeout, key_delay).await
}

/// Type a date into a masked calendar field and verify the round trip.
///
/// Masked fields reject bulk value assignment; entry must be per-character so
/// the mask engine consumes each keystroke. After typing, the field is read
/// back and must equal the `dd/MM/yyyy` rendering exactly — a mismatch means
/// the mask rejected part of the input and fails with `NavError::MaskedInput`.
pub async fn fill_masked_date(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    locator: &str,
    date: NaiveDate,
    timeout: Duration,
    key_delay: Duration,
) -> Result<(), NavError> {
    let formatted = date.format(DATE_FORMAT).to_string();

    info!(
        step_id = %ctx.step_id,
        tag = %ctx.tag,
        locator,
        date = %formatted,
        "filling masked date"
    );

    enter_value(page, ctx, locator, &formatted, timeout, key_delay).await?;

    let value = page.field_value(locator).await?;
    if value != formatted {
        return Err(NavError::MaskedInput(format!(
            "field '{locator}' shows '{value}' after entry, expected '{formatted}'"
        )));
    }
    Ok(())
}

/// Wait for the field to exist, clear it, then type the text. The whole
/// sequence is bounded by `timeout`.
async fn enter_value(
    page: &dyn PortalPage,
    ctx: &StepCtx,
    locator: &str,
    text: &str,
    timeout: Duration,
    key_delay: Duration,
) -> Result<(), NavError> {
    if ctx.is_cancelled() {
        return Err(NavError::Interrupted(format!(
            "cancelled before filling '{locator}'"
        )));
    }

    let deadline = Instant::now() + timeout;

    loop {
        match page.clear_field(locator).await {
            Ok(()) => break,
            Err(err) if err.is_transient() => {
                if Instant::now() >= deadline {
                    return Err(NavError::ElementNotFound(format!(
                        "field '{}' did not appear within {}ms",
                        locator,
                        timeout.as_millis()
                    )));
                }
                debug!(locator, "field not present yet, polling");
                sleep(POLL_INTERVAL).await;
            }
            Err(err) => return Err(err.into()),
        }
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    match tokio::time::timeout(remaining, page.type_chars(locator, text, key_delay)).await {
        Ok(result) => result.map_err(NavError::from),
        Err(_) => Err(NavError::Timeout(format!(
            "typing into '{}' exceeded {}ms",
            locator,
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_adapter::fake::FakePage;

    const FIELD: &str = "[id=\"formCasoGeral:j_idt64:calendar_input\"]";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn masked_date_round_trips_for_valid_dates() {
        let page = FakePage::new();
        let ctx = StepCtx::detached("t");

        let samples = [
            date(2026, 1, 1),
            date(2026, 12, 31),
            date(2024, 2, 29),
            date(2025, 7, 9),
        ];
        for sample in samples {
            fill_masked_date(
                &page,
                &ctx,
                FIELD,
                sample,
                Duration::from_secs(5),
                Duration::ZERO,
            )
            .await
            .unwrap();
            assert_eq!(
                page.field_value_of(FIELD),
                sample.format(DATE_FORMAT).to_string()
            );
        }
    }

    #[tokio::test]
    async fn mask_rejection_is_reported_as_masked_input() {
        let page = FakePage::new();
        // Mask drops every slash, so the read-back can never match.
        page.set_field_mask(FIELD, |raw| raw.replace('/', ""));
        let ctx = StepCtx::detached("t");

        let err = fill_masked_date(
            &page,
            &ctx,
            FIELD,
            date(2026, 3, 10),
            Duration::from_secs(5),
            Duration::ZERO,
        )
        .await
        .unwrap_err();

        match err {
            NavError::MaskedInput(msg) => {
                assert!(msg.contains("10032026"));
                assert!(msg.contains("10/03/2026"));
            }
            other => panic!("expected MaskedInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fill_field_clears_before_typing() {
        let page = FakePage::new();
        let ctx = StepCtx::detached("t");

        fill_field(&page, &ctx, "#ie", "111", Duration::from_secs(5), Duration::ZERO)
            .await
            .unwrap();
        fill_field(&page, &ctx, "#ie", "222", Duration::from_secs(5), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(page.field_value_of("#ie"), "222");
    }
}
