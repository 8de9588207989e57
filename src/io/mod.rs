//! Input/output helpers.
//!
//! - CSV tables with a typed schema (`table`)
//! - output naming, text report and JSON dump (`export`)

pub mod export;
pub mod table;

pub use export::*;
pub use table::*;
