//! Histogram filling and normalization.

pub mod builder;
pub mod histogram;
pub mod histogram2d;
pub mod normalize;

pub use builder::*;
pub use histogram::*;
pub use histogram2d::*;
pub use normalize::*;
