#![warn(missing_docs)]
//! Test surfaces for command dispatch: log capture and recording fixtures.

mod fixtures;
mod log_capture;

pub use fixtures::*;
pub use log_capture::*;
