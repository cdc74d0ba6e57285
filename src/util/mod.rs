//! Utility functions and helpers.

pub mod varint;
