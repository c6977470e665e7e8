//! Shared primitives for the DAR Web automation workspace: the normalized
//! submission record, the tax-process variants, and the batch outcome types
//! exchanged between the flow layer and its callers.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference period (competência) of a submission: month 1-12 plus 4-digit year.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RefPeriod {
    pub month: u32,
    pub year: i32,
}

impl RefPeriod {
    /// Build a period, rejecting out-of-range months and non-4-digit years.
    pub fn new(month: u32, year: i32) -> Result<Self, InvalidRecord> {
        if !(1..=12).contains(&month) {
            return Err(InvalidRecord::Month(month));
        }
        if !(1000..=9999).contains(&year) {
            return Err(InvalidRecord::Year(year));
        }
        Ok(Self { month, year })
    }

    /// Period as the portal's `MM/yyyy` field text.
    pub fn formatted(&self) -> String {
        format!("{:02}/{:04}", self.month, self.year)
    }
}

impl fmt::Display for RefPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

/// Validation errors for record construction.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum InvalidRecord {
    #[error("reference month out of range: {0}")]
    Month(u32),
    #[error("reference year out of range: {0}")]
    Year(i32),
    #[error("registration id is empty")]
    EmptyIe,
}

/// One taxpayer registration's submission data for a reference period.
///
/// Produced by the extraction collaborator already normalized (the IE carries
/// digits only); immutable once built — the orchestrator never mutates records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaeRecord {
    /// Normalized state registration id (Inscrição Estadual), digits only.
    pub ie: String,
    /// Reference period the payment declares.
    pub reference: RefPeriod,
    /// Due date of the payment document.
    pub due_date: NaiveDate,
    /// Date the payment will be made.
    pub payment_date: NaiveDate,
    /// Principal amount. `None` (or a non-finite / negative number) marks the
    /// record as non-executable: retained for display, excluded from submission.
    pub principal_value: Option<f64>,
}

impl DaeRecord {
    pub fn new(
        ie: impl Into<String>,
        reference: RefPeriod,
        due_date: NaiveDate,
        payment_date: NaiveDate,
        principal_value: Option<f64>,
    ) -> Result<Self, InvalidRecord> {
        let ie = ie.into();
        if ie.trim().is_empty() {
            return Err(InvalidRecord::EmptyIe);
        }
        Ok(Self {
            ie,
            reference,
            due_date,
            payment_date,
            principal_value,
        })
    }

    /// Whether this record may enter the submission state machine.
    pub fn is_executable(&self) -> bool {
        matches!(self.principal_value, Some(v) if v.is_finite() && v >= 0.0)
    }
}

/// The three known DAR Web process variants.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// ICMS Antecipação Parcial (revenue code 113011).
    AntecipacaoParcial,
    /// ICMS Apuração Normal (revenue code 113000).
    Normal,
    /// ICMS DIFAL — imposto, juros e multa (revenue code 113001).
    Difal,
}

impl ProcessKind {
    /// Revenue code the portal's code dropdown keys on.
    pub fn code(&self) -> &'static str {
        match self {
            ProcessKind::AntecipacaoParcial => "113011",
            ProcessKind::Normal => "113000",
            ProcessKind::Difal => "113001",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcessKind::AntecipacaoParcial => "ICMS Antecipação Parcial",
            ProcessKind::Normal => "ICMS Apuração Normal",
            ProcessKind::Difal => "ICMS Difal",
        }
    }
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.code())
    }
}

/// Classification of a per-record failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Page or element did not reach the expected state in time.
    Timeout,
    /// No control matched the expected text within the locator scope.
    ElementNotFound,
    /// Masked field value verification failed after entry.
    MaskedInput,
    /// Batch aborted by the caller before this record completed.
    Cancelled,
    /// Browser transport or portal-side error.
    Portal,
    /// Unexpected internal error.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ElementNotFound => "element-not-found",
            FailureKind::MaskedInput => "masked-input",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Portal => "portal",
            FailureKind::Internal => "internal",
        }
    }
}

/// Why a record failed, with the diagnostic screenshot when one was captured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
    pub artifact: Option<PathBuf>,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Option<PathBuf>) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "batch cancelled by caller")
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if let Some(path) = &self.artifact {
            write!(f, " (capture: {})", path.display())?;
        }
        Ok(())
    }
}

/// A failed record paired with its classified reason.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub ie: String,
    pub reason: FailureReason,
}

/// Partition of a batch: which IEs completed, which failed and why, plus the
/// records the precondition filter kept out of the state machine entirely.
///
/// `succeeded` and `failed` together cover exactly the executable records, in
/// processing order; `skipped` is tracked separately and never overlaps them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedRecord>,
    pub skipped: Vec<String>,
}

impl ExecutionOutcome {
    pub fn record_success(&mut self, ie: impl Into<String>) {
        self.succeeded.push(ie.into());
    }

    pub fn record_failure(&mut self, ie: impl Into<String>, reason: FailureReason) {
        self.failed.push(FailedRecord {
            ie: ie.into(),
            reason,
        });
    }

    pub fn record_skipped(&mut self, ie: impl Into<String>) {
        self.skipped.push(ie.into());
    }

    /// Number of records that entered (or were marked cancelled by) the machine.
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(value: Option<f64>) -> DaeRecord {
        DaeRecord::new(
            "190123456",
            RefPeriod::new(6, 2026).unwrap(),
            date(2026, 7, 15),
            date(2026, 7, 10),
            value,
        )
        .unwrap()
    }

    #[test]
    fn period_formatting_pads_month() {
        assert_eq!(RefPeriod::new(6, 2026).unwrap().formatted(), "06/2026");
        assert_eq!(RefPeriod::new(12, 2026).unwrap().formatted(), "12/2026");
    }

    #[test]
    fn period_rejects_out_of_range() {
        assert!(RefPeriod::new(0, 2026).is_err());
        assert!(RefPeriod::new(13, 2026).is_err());
        assert!(RefPeriod::new(6, 99).is_err());
    }

    #[test]
    fn executability_requires_finite_non_negative_value() {
        assert!(record(Some(1234.56)).is_executable());
        assert!(record(Some(0.0)).is_executable());
        assert!(!record(None).is_executable());
        assert!(!record(Some(-1.0)).is_executable());
        assert!(!record(Some(f64::NAN)).is_executable());
        assert!(!record(Some(f64::INFINITY)).is_executable());
    }

    #[test]
    fn empty_ie_is_rejected() {
        let err = DaeRecord::new(
            "  ",
            RefPeriod::new(1, 2026).unwrap(),
            date(2026, 2, 10),
            date(2026, 2, 5),
            Some(10.0),
        );
        assert_eq!(err.unwrap_err(), InvalidRecord::EmptyIe);
    }

    #[test]
    fn outcome_partitions_accumulate_in_order() {
        let mut outcome = ExecutionOutcome::default();
        outcome.record_success("111");
        outcome.record_failure(
            "222",
            FailureReason::new(FailureKind::Timeout, "page did not load"),
        );
        outcome.record_skipped("333");

        assert_eq!(outcome.succeeded, vec!["111"]);
        assert_eq!(outcome.failed[0].ie, "222");
        assert_eq!(outcome.failed[0].reason.kind, FailureKind::Timeout);
        assert_eq!(outcome.skipped, vec!["333"]);
        assert_eq!(outcome.processed(), 2);
        assert!(!outcome.is_clean());
    }

    #[test]
    fn failure_reason_display_includes_artifact() {
        let reason = FailureReason::new(FailureKind::MaskedInput, "value mismatch")
            .with_artifact(Some(PathBuf::from("captures/190_1.png")));
        let text = reason.to_string();
        assert!(text.starts_with("masked-input: value mismatch"));
        assert!(text.contains("captures/190_1.png"));
    }
}
