//! Cosine fitting.
//!
//! Responsibilities:
//!
//! - derive starting values and bounds from histogram extrema
//! - run the bounded weighted least squares fit per histogram
//! - tolerate per-histogram failures

pub mod fitter;
pub mod guess;

pub use fitter::*;
pub use guess::*;
