//! Utility functions.

pub mod browser;
