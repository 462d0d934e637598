//! padlink Library
//!
//! Headless front-end for the compile → deliver → hot reload cycle against
//! the DartPad service.

pub mod headless;

// Re-export main entry points
pub use headless::runner::{run_headless, HeadlessOptions};
