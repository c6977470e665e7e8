//! CLI collaborator for the DAR Web automation core.
//!
//! Loads normalized record files, resolves the process-wide configuration
//! once at startup, and hands both to the batch runner. No extraction or
//! column-mapping logic lives here — input files are already normalized.

pub mod config;
pub mod input;
