//! Console output
//!
//! Human-readable rendering of the configuration, the periodic progress
//! line and the end-of-run summary.

pub mod text;
