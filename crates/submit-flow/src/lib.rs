//! Submission flow orchestration for the DAR Web portal.
//!
//! [`SubmissionMachine`] drives one record through the portal's multi-page
//! form as a fixed sequence of named steps; [`BatchRunner`] sequences the
//! machine over an ordered record list with inter-record throttling and
//! cooperative cancellation. The three tax-process variants differ only in
//! their [`SelectorProfile`] data, plus the optional substitution dropdown.

pub mod machine;
pub mod profile;
pub mod runner;

pub use machine::{FlowConfig, SubmissionMachine, SubmissionStep, DEFAULT_PORTAL_URL};
pub use profile::{Disambiguated, SelectorProfile};
pub use runner::BatchRunner;
