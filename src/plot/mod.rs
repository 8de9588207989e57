//! Plot rendering: PNG files via plotters and a terminal ASCII preview.

pub mod ascii;
pub mod png;

pub use ascii::*;
pub use png::*;
