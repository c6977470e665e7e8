//! The per-record submission state machine.

use std::path::PathBuf;
use std::time::Duration;

use darweb_core_types::{DaeRecord, FailureKind, FailureReason};
use nav_primitives::{
    capture_failure_artifact, click_by_visible_text, click_link_by_text, fill_field,
    fill_masked_date, select_option_by_label, wait_for_page_ready, NavError, StepCtx,
};
use portal_adapter::PortalPage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// DAR Web portal entry point.
pub const DEFAULT_PORTAL_URL: &str =
    "https://webas.sefaz.pi.gov.br/darweb/faces/views/index.xhtml";

/// Backoff before the single optional retry of a transient step failure.
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Flow configuration, resolved once at process start and passed by
/// reference into the machine and the batch runner.
#[derive(Clone, Debug)]
pub struct FlowConfig {
    pub portal_url: String,
    /// Full page loads (navigation, post-submit renders).
    pub page_load_timeout: Duration,
    /// Individual element waits.
    pub element_timeout: Duration,
    /// Settle interval after the load event, for late-rendering JSF panels.
    pub settle_interval: Duration,
    /// Pause between keystrokes in masked fields.
    pub key_delay: Duration,
    /// Retry a step once on transient failures (timeout, transport) before
    /// classifying the record as failed. Off by default.
    pub retry_transient: bool,
    /// Append-only directory for failure screenshots.
    pub capture_dir: PathBuf,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            page_load_timeout: Duration::from_millis(30_000),
            element_timeout: Duration::from_millis(15_000),
            settle_interval: Duration::from_millis(750),
            key_delay: Duration::from_millis(40),
            retry_transient: false,
            capture_dir: PathBuf::from("captures"),
        }
    }
}

/// Named steps of the submission flow, in execution order. Any step failure
/// transitions straight to the terminal failed state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SubmissionStep {
    OpenPortal,
    OpenMenu,
    SelectCode,
    FillIdentifier,
    FillPeriodAndDates,
    Calculate,
    Confirm,
}

impl SubmissionStep {
    pub const FIRST: SubmissionStep = SubmissionStep::OpenPortal;

    pub fn next(self) -> Option<SubmissionStep> {
        match self {
            SubmissionStep::OpenPortal => Some(SubmissionStep::OpenMenu),
            SubmissionStep::OpenMenu => Some(SubmissionStep::SelectCode),
            SubmissionStep::SelectCode => Some(SubmissionStep::FillIdentifier),
            SubmissionStep::FillIdentifier => Some(SubmissionStep::FillPeriodAndDates),
            SubmissionStep::FillPeriodAndDates => Some(SubmissionStep::Calculate),
            SubmissionStep::Calculate => Some(SubmissionStep::Confirm),
            SubmissionStep::Confirm => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SubmissionStep::OpenPortal => "OpenPortal",
            SubmissionStep::OpenMenu => "OpenMenu",
            SubmissionStep::SelectCode => "SelectCode",
            SubmissionStep::FillIdentifier => "FillIdentifier",
            SubmissionStep::FillPeriodAndDates => "FillPeriodAndDates",
            SubmissionStep::Calculate => "Calculate",
            SubmissionStep::Confirm => "Confirm",
        }
    }
}

/// Drives one record through the full portal flow.
///
/// The machine owns no browser state of its own: it borrows the single page
/// of the batch session and re-opens the portal root at the start of every
/// record, so no form state leaks between submissions.
pub struct SubmissionMachine<'a> {
    page: &'a dyn PortalPage,
    profile: &'a crate::profile::SelectorProfile,
    config: &'a FlowConfig,
}

impl<'a> SubmissionMachine<'a> {
    pub fn new(
        page: &'a dyn PortalPage,
        profile: &'a crate::profile::SelectorProfile,
        config: &'a FlowConfig,
    ) -> Self {
        Self {
            page,
            profile,
            config,
        }
    }

    /// Run the state machine for one record.
    ///
    /// Every primitive failure is caught here, converted into a classified
    /// [`FailureReason`] with a screenshot where possible, and never
    /// propagates past this record. Cancellation is checked between steps;
    /// a step already running completes or hits its own timeout.
    pub async fn submit(
        &self,
        record: &DaeRecord,
        cancel: &CancellationToken,
    ) -> Result<(), FailureReason> {
        let mut step = SubmissionStep::FIRST;

        loop {
            if cancel.is_cancelled() {
                info!(ie = %record.ie, step = step.name(), "cancelled between steps");
                return Err(FailureReason::cancelled());
            }

            let ctx = StepCtx::new(cancel.clone(), record.ie.clone());
            debug!(ie = %record.ie, step = step.name(), "entering step");

            if let Err(err) = self.run_step_with_retry(step, record, &ctx).await {
                warn!(ie = %record.ie, step = step.name(), %err, "record failed");
                let artifact = if matches!(err, NavError::Interrupted(_)) {
                    None
                } else {
                    capture_failure_artifact(self.page, &self.config.capture_dir, &record.ie, &err)
                        .await
                };
                return Err(classify(step, &err).with_artifact(artifact));
            }

            match step.next() {
                Some(next) => step = next,
                None => {
                    info!(ie = %record.ie, "record submitted");
                    return Ok(());
                }
            }
        }
    }

    async fn run_step_with_retry(
        &self,
        step: SubmissionStep,
        record: &DaeRecord,
        ctx: &StepCtx,
    ) -> Result<(), NavError> {
        match self.run_step(step, record, ctx).await {
            Err(err) if self.config.retry_transient && err.is_retryable() => {
                warn!(
                    ie = %record.ie,
                    step = step.name(),
                    %err,
                    "transient step failure, retrying once"
                );
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.run_step(step, record, ctx).await
            }
            other => other,
        }
    }

    async fn run_step(
        &self,
        step: SubmissionStep,
        record: &DaeRecord,
        ctx: &StepCtx,
    ) -> Result<(), NavError> {
        let profile = self.profile;
        let config = self.config;

        match step {
            SubmissionStep::OpenPortal => {
                self.page
                    .navigate(&config.portal_url, config.page_load_timeout)
                    .await
                    .map_err(NavError::from)?;
                wait_for_page_ready(
                    self.page,
                    ctx,
                    config.page_load_timeout,
                    config.settle_interval,
                )
                .await
            }

            SubmissionStep::OpenMenu => {
                click_link_by_text(
                    self.page,
                    ctx,
                    &profile.menu_link.locator,
                    &profile.menu_link.label,
                    config.element_timeout,
                )
                .await
            }

            SubmissionStep::SelectCode => {
                select_option_by_label(
                    self.page,
                    ctx,
                    &profile.code_select,
                    &profile.code_option_label,
                    config.element_timeout,
                )
                .await?;
                self.click_button(ctx, &profile.advance_label).await
            }

            SubmissionStep::FillIdentifier => {
                fill_field(
                    self.page,
                    ctx,
                    &profile.ie_field,
                    &record.ie,
                    config.element_timeout,
                    config.key_delay,
                )
                .await?;
                if let Some(substitution) = &profile.substitution {
                    select_option_by_label(
                        self.page,
                        ctx,
                        &substitution.locator,
                        &substitution.label,
                        config.element_timeout,
                    )
                    .await?;
                }
                self.click_button(ctx, &profile.advance_label).await
            }

            SubmissionStep::FillPeriodAndDates => {
                let value = record
                    .principal_value
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| {
                        NavError::Internal(format!(
                            "record {} without principal value reached the form",
                            record.ie
                        ))
                    })?;

                fill_field(
                    self.page,
                    ctx,
                    &profile.period_field,
                    &record.reference.formatted(),
                    config.element_timeout,
                    config.key_delay,
                )
                .await?;
                fill_masked_date(
                    self.page,
                    ctx,
                    &profile.due_date_field,
                    record.due_date,
                    config.element_timeout,
                    config.key_delay,
                )
                .await?;
                fill_masked_date(
                    self.page,
                    ctx,
                    &profile.payment_date_field,
                    record.payment_date,
                    config.element_timeout,
                    config.key_delay,
                )
                .await?;
                fill_field(
                    self.page,
                    ctx,
                    &profile.principal_value_field,
                    &format_principal_value(value),
                    config.element_timeout,
                    config.key_delay,
                )
                .await
            }

            SubmissionStep::Calculate => {
                self.click_button(ctx, &profile.calculate_label).await?;
                wait_for_page_ready(
                    self.page,
                    ctx,
                    config.page_load_timeout,
                    config.settle_interval,
                )
                .await
            }

            SubmissionStep::Confirm => {
                self.click_button(ctx, &profile.confirm_label).await?;
                wait_for_page_ready(
                    self.page,
                    ctx,
                    config.page_load_timeout,
                    config.settle_interval,
                )
                .await
            }
        }
    }

    async fn click_button(&self, ctx: &StepCtx, label: &str) -> Result<(), NavError> {
        click_by_visible_text(
            self.page,
            ctx,
            &self.profile.button_scope,
            label,
            self.config.element_timeout,
        )
        .await
    }
}

/// Map a primitive error into the batch failure taxonomy, prefixed with the
/// step that raised it.
fn classify(step: SubmissionStep, err: &NavError) -> FailureReason {
    let kind = match err {
        NavError::Timeout(_) => FailureKind::Timeout,
        NavError::ElementNotFound(_) => FailureKind::ElementNotFound,
        NavError::MaskedInput(_) => FailureKind::MaskedInput,
        NavError::Interrupted(_) => FailureKind::Cancelled,
        NavError::PageIo(_) => FailureKind::Portal,
        NavError::Internal(_) => FailureKind::Internal,
    };
    FailureReason::new(kind, format!("{}: {}", step.name(), err))
}

/// Principal value as typed into the portal's masked currency field:
/// pt-BR decimal comma, two digits, grouping left to the mask engine.
fn format_principal_value(value: f64) -> String {
    format!("{value:.2}").replace('.', ",")
}
