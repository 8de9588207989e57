//! Reporting: the text fit report and terminal summaries.

pub mod format;

pub use format::*;
