//! Navigation primitives for the DAR Web portal.
//!
//! The only operations in the workspace that touch a browser page:
//! - page-ready waiting with a settle interval for late-rendering JSF content
//! - clicking controls disambiguated by visible text (the portal reuses one
//!   CSS class across most of its buttons)
//! - masked field entry with per-keystroke pacing and read-back verification
//! - failure screenshot capture
//!
//! Every primitive takes an explicit timeout and polls; none retries a failed
//! operation — retry policy belongs to the orchestrator.

pub mod artifact;
pub mod click;
pub mod errors;
pub mod fill;
pub mod ready;
pub mod select;
pub mod types;

pub use artifact::capture_failure_artifact;
pub use click::{click_by_visible_text, click_link_by_text};
pub use errors::NavError;
pub use fill::{fill_field, fill_masked_date, DATE_FORMAT};
pub use ready::wait_for_page_ready;
pub use select::select_option_by_label;
pub use types::{StepCtx, POLL_INTERVAL};
