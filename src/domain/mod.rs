//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - selection cuts (`CutRange`, `CutSet`)
//! - bin geometry (`BinGeometry`, `BinSlot`)
//! - fit outputs (`FitResult`, `FitParam`)
//! - the resolved pipeline configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
