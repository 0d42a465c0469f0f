//! Integration test crate for cutline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every cutline library crate to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod properties;

#[cfg(test)]
mod render;
