//! Batch sequencing over an ordered record list.

use std::time::Duration;

use darweb_core_types::{DaeRecord, ExecutionOutcome, FailureReason};
use portal_adapter::PortalPage;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::machine::{FlowConfig, SubmissionMachine};
use crate::profile::SelectorProfile;

/// Sequences the submission machine over many records.
///
/// Guarantees: processing order equals input order; the inter-record delay is
/// honored between the completion of one record and the start of the next
/// (never before the first or after the last); a cancellation request marks
/// every unprocessed record as failed/cancelled and returns the partial
/// outcome. One runner drives exactly one page — browser sessions are never
/// shared across concurrent runs.
pub struct BatchRunner<'a> {
    page: &'a dyn PortalPage,
    profile: &'a SelectorProfile,
    config: &'a FlowConfig,
    delay_between: Duration,
    cancel: CancellationToken,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        page: &'a dyn PortalPage,
        profile: &'a SelectorProfile,
        config: &'a FlowConfig,
        delay_between: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            page,
            profile,
            config,
            delay_between,
            cancel,
        }
    }

    /// Process the batch and return the outcome partition.
    ///
    /// Records failing the executability precondition never reach the state
    /// machine (no portal traffic for them); they are reported in
    /// `skipped`, outside the succeeded/failed partition.
    pub async fn run(&self, records: &[DaeRecord]) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::default();
        let machine = SubmissionMachine::new(self.page, self.profile, self.config);

        let mut executable: Vec<&DaeRecord> = Vec::new();
        for record in records {
            if record.is_executable() {
                executable.push(record);
            } else {
                info!(ie = %record.ie, "record skipped: principal value absent or invalid");
                outcome.record_skipped(&record.ie);
            }
        }

        let total = executable.len();
        info!(
            process = %self.profile.process,
            total,
            skipped = outcome.skipped.len(),
            delay_ms = self.delay_between.as_millis() as u64,
            "starting batch"
        );

        let mut cancelled = false;
        for (index, record) in executable.into_iter().enumerate() {
            if cancelled || self.cancel.is_cancelled() {
                cancelled = true;
                outcome.record_failure(&record.ie, FailureReason::cancelled());
                continue;
            }

            if index > 0 && !self.delay_between.is_zero() {
                debug!(delay_ms = self.delay_between.as_millis() as u64, "inter-record delay");
                tokio::select! {
                    _ = sleep(self.delay_between) => {}
                    _ = self.cancel.cancelled() => {
                        cancelled = true;
                        outcome.record_failure(&record.ie, FailureReason::cancelled());
                        continue;
                    }
                }
            }

            info!(ie = %record.ie, position = index + 1, total, "processing record");
            match machine.submit(record, &self.cancel).await {
                Ok(()) => outcome.record_success(&record.ie),
                Err(reason) => {
                    warn!(ie = %record.ie, %reason, "record failed");
                    outcome.record_failure(&record.ie, reason);
                }
            }
        }

        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            "batch finished"
        );
        outcome
    }
}
