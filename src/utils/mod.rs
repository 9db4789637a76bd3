//! Utility functions and helpers.

pub mod dates;
