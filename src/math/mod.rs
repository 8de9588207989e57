//! Mathematical utilities: dense least squares and bounded Levenberg–Marquardt.

pub mod linalg;
pub mod lm;

pub use linalg::*;
pub use lm::*;
