//! Sample catalog and synthetic sample generation.

pub mod catalog;
pub mod synth;

pub use catalog::*;
pub use synth::*;
