//! Utility functions
//!
//! Provides logging setup for the binaries.

pub mod logging;
