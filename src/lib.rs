//! `phicp-tools` library crate.
//!
//! The binary (`phicp`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the histogram → normalize → fit → report pipeline can be driven from tests
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hist;
pub mod inspect;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
